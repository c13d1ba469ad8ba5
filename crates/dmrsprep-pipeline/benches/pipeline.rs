//! End-to-end pipeline benchmark over a synthetic sentence graph.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dmrsprep_pipeline::align::table::RuleSet;
use dmrsprep_pipeline::{CycleCounters, Options, process};

fn sample_dmrs() -> String {
    let mut xml = String::from(r#"<dmrs cfrom="0" cto="63">"#);
    let words = [
        "the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog",
    ];
    let mut offset = 0;
    for (i, word) in words.iter().enumerate() {
        let id = 10 + 10 * i;
        let end = offset + word.len() - 1;
        xml.push_str(&format!(
            r#"<node nodeid="{id}" cfrom="{offset}" cto="{end}"><realpred lemma="{word}" pos="n"/><sortinfo num="sg" pers="3"/></node>"#
        ));
        offset = end + 2;
    }
    for i in 0..words.len() - 1 {
        let from = 10 + 10 * i;
        let to = from + 10;
        xml.push_str(&format!(
            r#"<link from="{from}" to="{to}"><rargname>ARG1</rargname><post>NEQ</post></link>"#
        ));
    }
    // Close a cycle so the remover has work to do.
    xml.push_str(r#"<link from="90" to="10"><rargname>ARG2</rargname><post>NEQ</post></link>"#);
    xml.push_str("</dmrs>");
    xml
}

fn bench_process(c: &mut Criterion) {
    let dmrs = sample_dmrs();
    let untok = "the quick brown fox jumps over the lazy dog";
    let tok: Vec<String> = untok.split(' ').map(str::to_string).collect();
    let table = RuleSet::bundled();

    let options = Options {
        handle_ltop: true,
        token_align: true,
        unaligned_align: true,
        heuristics: Some(&table),
        label: true,
        carg_clean: true,
        cycle_remove: true,
        attach_untok: true,
        attach_tok: true,
        ..Options::default()
    };

    c.bench_function("process_sentence", |b| {
        b.iter(|| {
            let mut counters = CycleCounters::default();
            let out = process(
                black_box(&dmrs),
                black_box(untok),
                black_box(&tok),
                &options,
                &mut counters,
            )
            .expect("process");
            black_box(out)
        });
    });
}

criterion_group!(benches, bench_process);
criterion_main!(benches);
