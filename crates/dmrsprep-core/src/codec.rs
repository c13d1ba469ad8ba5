//! DMRS XML codec: load, dump, and stream splitting.
//!
//! # Schema
//!
//! ```text
//! <dmrs cfrom=.. cto=.. [ltop=..] [index=..] [untok=..] [tok=..]>
//!   <node nodeid=.. cfrom=.. cto=.. [carg=..] [tokalign=..]>
//!     <realpred lemma=.. pos=.. [sense=..]/> | <gpred>name</gpred>
//!     [<sortinfo num=.. pers=.. .../>]
//!   </node>
//!   <link from=.. to=..><rargname>ARG1</rargname><post>NEQ</post></link>
//! </dmrs>
//! ```
//!
//! Attributes the pipeline does not own are preserved so that untouched
//! subtrees round-trip byte-stably, modulo attribute ordering. On dump,
//! nodes are sorted by integer `nodeid` and links by `(from, to, label)`
//! so downstream diffing and testing see deterministic output.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;

use crate::error::{CodecError, DmrsError, GraphError};
use crate::model::{Edge, Graph, Node, NodeId, Pred, Sortinfo};

/// Split a concatenated DMRS byte-stream into one chunk per graph.
///
/// Chunks are delimited by `<dmrs`; surrounding whitespace is dropped.
#[must_use]
pub fn split_stream(content: &str) -> Vec<String> {
    content
        .split("<dmrs")
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            let glued = format!("<dmrs{chunk}");
            glued.trim().to_string()
        })
        .collect()
}

/// Which child element's text content is being captured.
enum TextTarget {
    Gpred,
    Rargname,
    Post,
}

/// Load one DMRS XML document into a [`Graph`].
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for unparseable XML,
/// [`CodecError::MissingAttribute`] / [`CodecError::InvalidNumber`] for
/// schema violations, and [`GraphError::DanglingEdge`] when a link
/// references a node that does not exist (the LTOP ghost excepted).
pub fn load(input: &str) -> Result<Graph, DmrsError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut graph = Graph::default();
    let mut seen_root = false;
    let mut current_node: Option<Node> = None;
    let mut current_edge: Option<Edge> = None;
    let mut text_target: Option<TextTarget> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CodecError::Malformed {
                reason: e.to_string(),
            })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"dmrs" => {
                        seen_root = true;
                        for attr in e.attributes() {
                            let attr = attr.map_err(malformed_attr)?;
                            graph.attrs.insert(
                                attr_key(&attr)?,
                                attr_value(&attr)?,
                            );
                        }
                        if empty {
                            break;
                        }
                    }
                    b"node" => {
                        let node = read_node_start(e)?;
                        if empty {
                            graph.nodes.push(node);
                        } else {
                            current_node = Some(node);
                        }
                    }
                    b"link" => {
                        let edge = read_link_start(e)?;
                        if empty {
                            graph.edges.push(edge);
                        } else {
                            current_edge = Some(edge);
                        }
                    }
                    b"realpred" => {
                        if let Some(node) = current_node.as_mut() {
                            node.pred = Some(read_realpred(e)?);
                        }
                    }
                    b"gpred" => {
                        if current_node.is_some() && !empty {
                            text_target = Some(TextTarget::Gpred);
                        }
                    }
                    b"sortinfo" => {
                        if let Some(node) = current_node.as_mut() {
                            let mut sortinfo = Sortinfo::new();
                            for attr in e.attributes() {
                                let attr = attr.map_err(malformed_attr)?;
                                sortinfo.set(&attr_key(&attr)?, &attr_value(&attr)?);
                            }
                            node.sortinfo = Some(sortinfo);
                        }
                    }
                    b"rargname" => {
                        if current_edge.is_some() && !empty {
                            text_target = Some(TextTarget::Rargname);
                        }
                    }
                    b"post" => {
                        if current_edge.is_some() && !empty {
                            text_target = Some(TextTarget::Post);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                let text = t
                    .unescape()
                    .map_err(|e| CodecError::Malformed {
                        reason: e.to_string(),
                    })?
                    .into_owned();
                match text_target {
                    Some(TextTarget::Gpred) => {
                        if let Some(node) = current_node.as_mut() {
                            node.pred = Some(Pred::Gpred(text));
                        }
                    }
                    Some(TextTarget::Rargname) => {
                        if let Some(edge) = current_edge.as_mut() {
                            edge.rargname = Some(text);
                        }
                    }
                    Some(TextTarget::Post) => {
                        if let Some(edge) = current_edge.as_mut() {
                            edge.post = Some(text);
                        }
                    }
                    None => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"node" => {
                    if let Some(node) = current_node.take() {
                        graph.nodes.push(node);
                    }
                }
                b"link" => {
                    if let Some(edge) = current_edge.take() {
                        graph.edges.push(edge);
                    }
                }
                b"gpred" | b"rargname" | b"post" => {
                    text_target = None;
                }
                b"dmrs" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(CodecError::Malformed {
            reason: "no <dmrs> element found".into(),
        }
        .into());
    }

    validate_edges(&graph)?;
    Ok(graph)
}

/// Serialize a [`Graph`] back to DMRS XML.
///
/// Nodes are emitted sorted by integer `nodeid`, links by
/// `(from, to, label)`; root and element attributes come out in a fixed
/// deterministic order.
#[must_use]
pub fn dump(graph: &Graph) -> String {
    let mut writer = Writer::new(Vec::new());
    let mut root = BytesStart::new("dmrs");
    for (key, value) in &graph.attrs {
        root.push_attribute((key.as_str(), value.as_str()));
    }

    if graph.is_empty() {
        let _ = writer.write_event(Event::Empty(root));
        return into_string(writer);
    }

    let _ = writer.write_event(Event::Start(root));
    let _ = writer.write_event(Event::Text(BytesText::new("\n")));

    let mut nodes: Vec<&Node> = graph.nodes.iter().collect();
    nodes.sort_by_key(|n| n.node_id);
    for node in nodes {
        write_node(&mut writer, node);
        let _ = writer.write_event(Event::Text(BytesText::new("\n")));
    }

    let mut edges: Vec<&Edge> = graph.edges.iter().collect();
    edges.sort_by_key(|e| e.key());
    for edge in edges {
        write_edge(&mut writer, edge);
        let _ = writer.write_event(Event::Text(BytesText::new("\n")));
    }

    let _ = writer.write_event(Event::End(BytesEnd::new("dmrs")));
    into_string(writer)
}

// ---------------------------------------------------------------------------
// Reading helpers
// ---------------------------------------------------------------------------

fn malformed_attr(e: quick_xml::events::attributes::AttrError) -> CodecError {
    CodecError::Malformed {
        reason: e.to_string(),
    }
}

fn attr_key(attr: &quick_xml::events::attributes::Attribute<'_>) -> Result<String, CodecError> {
    String::from_utf8(attr.key.as_ref().to_vec()).map_err(|e| CodecError::Malformed {
        reason: e.to_string(),
    })
}

fn attr_value(attr: &quick_xml::events::attributes::Attribute<'_>) -> Result<String, CodecError> {
    Ok(attr
        .unescape_value()
        .map_err(|e| CodecError::Malformed {
            reason: e.to_string(),
        })?
        .into_owned())
}

fn parse_int<T: std::str::FromStr>(
    attribute: &'static str,
    raw: &str,
) -> Result<T, CodecError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| CodecError::InvalidNumber {
        attribute,
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_tokalign(raw: &str) -> Result<Vec<usize>, CodecError> {
    if raw == "-1" {
        return Ok(Vec::new());
    }
    raw.split_whitespace()
        .map(|tok| parse_int::<usize>("tokalign", tok))
        .collect()
}

fn read_node_start(e: &BytesStart<'_>) -> Result<Node, DmrsError> {
    let mut node_id = None;
    let mut cfrom = None;
    let mut cto = None;
    let mut node = Node::new(NodeId(0), 0, 0);

    for attr in e.attributes() {
        let attr = attr.map_err(malformed_attr)?;
        let key = attr_key(&attr)?;
        let value = attr_value(&attr)?;
        match key.as_str() {
            "nodeid" => node_id = Some(NodeId(parse_int("nodeid", &value)?)),
            "cfrom" => cfrom = Some(parse_int("cfrom", &value)?),
            "cto" => cto = Some(parse_int("cto", &value)?),
            "carg" => node.carg = Some(value),
            "tokalign" => node.tokalign = Some(parse_tokalign(&value)?),
            "label" => node.label = Some(value),
            "label_idx" => node.label_idx = Some(parse_int("label_idx", &value)?),
            "tok" => node.tok = Some(value),
            "tok_idx" => node.tok_idx = Some(value),
            _ => {
                node.extra.insert(key, value);
            }
        }
    }

    node.node_id = node_id.ok_or(CodecError::MissingAttribute {
        element: "node",
        attribute: "nodeid",
    })?;
    node.cfrom = cfrom.ok_or(CodecError::MissingAttribute {
        element: "node",
        attribute: "cfrom",
    })?;
    node.cto = cto.ok_or(CodecError::MissingAttribute {
        element: "node",
        attribute: "cto",
    })?;
    Ok(node)
}

fn read_link_start(e: &BytesStart<'_>) -> Result<Edge, DmrsError> {
    let mut from = None;
    let mut to = None;
    let mut edge = Edge::new(NodeId(0), NodeId(0), None, None);

    for attr in e.attributes() {
        let attr = attr.map_err(malformed_attr)?;
        let key = attr_key(&attr)?;
        let value = attr_value(&attr)?;
        match key.as_str() {
            "from" => from = Some(NodeId(parse_int("from", &value)?)),
            "to" => to = Some(NodeId(parse_int("to", &value)?)),
            "label" => edge.label = Some(value),
            "label_idx" => edge.label_idx = Some(parse_int("label_idx", &value)?),
            _ => {
                edge.extra.insert(key, value);
            }
        }
    }

    edge.from = from.ok_or(CodecError::MissingAttribute {
        element: "link",
        attribute: "from",
    })?;
    edge.to = to.ok_or(CodecError::MissingAttribute {
        element: "link",
        attribute: "to",
    })?;
    Ok(edge)
}

fn read_realpred(e: &BytesStart<'_>) -> Result<Pred, DmrsError> {
    let mut lemma = None;
    let mut pos = None;
    let mut sense = None;
    for attr in e.attributes() {
        let attr = attr.map_err(malformed_attr)?;
        match attr_key(&attr)?.as_str() {
            "lemma" => lemma = Some(attr_value(&attr)?),
            "pos" => pos = Some(attr_value(&attr)?),
            "sense" => sense = Some(attr_value(&attr)?),
            _ => {}
        }
    }
    Ok(Pred::Real { lemma, pos, sense })
}

fn validate_edges(graph: &Graph) -> Result<(), DmrsError> {
    let ids: BTreeSet<NodeId> = graph.nodes.iter().map(|n| n.node_id).collect();
    for edge in &graph.edges {
        if edge.from != NodeId::GHOST && !ids.contains(&edge.from) {
            return Err(GraphError::DanglingEdge { node_id: edge.from }.into());
        }
        if !ids.contains(&edge.to) {
            return Err(GraphError::DanglingEdge { node_id: edge.to }.into());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Writing helpers
// ---------------------------------------------------------------------------

fn into_string(writer: Writer<Vec<u8>>) -> String {
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

fn tokalign_attr(tokalign: &[usize]) -> String {
    if tokalign.is_empty() {
        "-1".to_string()
    } else {
        tokalign
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) {
    let mut start = BytesStart::new("node");
    start.push_attribute(("nodeid", node.node_id.to_string().as_str()));
    start.push_attribute(("cfrom", node.cfrom.to_string().as_str()));
    start.push_attribute(("cto", node.cto.to_string().as_str()));
    if let Some(carg) = &node.carg {
        start.push_attribute(("carg", carg.as_str()));
    }
    if let Some(tokalign) = &node.tokalign {
        start.push_attribute(("tokalign", tokalign_attr(tokalign).as_str()));
    }
    if let Some(label) = &node.label {
        start.push_attribute(("label", label.as_str()));
    }
    if let Some(label_idx) = node.label_idx {
        start.push_attribute(("label_idx", label_idx.to_string().as_str()));
    }
    if let Some(tok) = &node.tok {
        start.push_attribute(("tok", tok.as_str()));
    }
    if let Some(tok_idx) = &node.tok_idx {
        start.push_attribute(("tok_idx", tok_idx.as_str()));
    }
    for (key, value) in &node.extra {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.pred.is_none() && node.sortinfo.is_none() {
        let _ = writer.write_event(Event::Empty(start));
        return;
    }

    let _ = writer.write_event(Event::Start(start));
    match &node.pred {
        Some(Pred::Real { lemma, pos, sense }) => {
            let mut realpred = BytesStart::new("realpred");
            if let Some(lemma) = lemma {
                realpred.push_attribute(("lemma", lemma.as_str()));
            }
            if let Some(pos) = pos {
                realpred.push_attribute(("pos", pos.as_str()));
            }
            if let Some(sense) = sense {
                realpred.push_attribute(("sense", sense.as_str()));
            }
            let _ = writer.write_event(Event::Empty(realpred));
        }
        Some(Pred::Gpred(name)) => {
            let _ = writer.write_event(Event::Start(BytesStart::new("gpred")));
            let _ = writer.write_event(Event::Text(BytesText::new(name)));
            let _ = writer.write_event(Event::End(BytesEnd::new("gpred")));
        }
        None => {}
    }
    if let Some(sortinfo) = &node.sortinfo {
        let mut elem = BytesStart::new("sortinfo");
        for (key, value) in sortinfo.iter() {
            elem.push_attribute((key, value));
        }
        let _ = writer.write_event(Event::Empty(elem));
    }
    let _ = writer.write_event(Event::End(BytesEnd::new("node")));
}

fn write_edge(writer: &mut Writer<Vec<u8>>, edge: &Edge) {
    let mut start = BytesStart::new("link");
    start.push_attribute(("from", edge.from.to_string().as_str()));
    start.push_attribute(("to", edge.to.to_string().as_str()));
    if let Some(label) = &edge.label {
        start.push_attribute(("label", label.as_str()));
    }
    if let Some(label_idx) = edge.label_idx {
        start.push_attribute(("label_idx", label_idx.to_string().as_str()));
    }
    for (key, value) in &edge.extra {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if edge.rargname.is_none() && edge.post.is_none() {
        let _ = writer.write_event(Event::Empty(start));
        return;
    }

    let _ = writer.write_event(Event::Start(start));
    if let Some(rargname) = &edge.rargname {
        let _ = writer.write_event(Event::Start(BytesStart::new("rargname")));
        let _ = writer.write_event(Event::Text(BytesText::new(rargname)));
        let _ = writer.write_event(Event::End(BytesEnd::new("rargname")));
    }
    if let Some(post) = &edge.post {
        let _ = writer.write_event(Event::Start(BytesStart::new("post")));
        let _ = writer.write_event(Event::Text(BytesText::new(post)));
        let _ = writer.write_event(Event::End(BytesEnd::new("post")));
    }
    let _ = writer.write_event(Event::End(BytesEnd::new("link")));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        r#"<dmrs cfrom="0" cto="13" index="10">"#,
        "\n",
        r#"<node nodeid="10" cfrom="0" cto="2"><realpred lemma="dog" pos="n"/><sortinfo num="sg" pers="3"/></node>"#,
        "\n",
        r#"<node nodeid="20" cfrom="3" cto="8"><gpred>def_q</gpred><sortinfo/></node>"#,
        "\n",
        r#"<link from="20" to="10"><rargname>RSTR</rargname><post>H</post></link>"#,
        "\n",
        "</dmrs>"
    );

    #[test]
    fn load_reads_nodes_and_links() {
        let graph = load(SAMPLE).expect("load");
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.attr("index"), Some("10"));

        let dog = graph.node(NodeId(10)).expect("node 10");
        assert_eq!(dog.pred.as_ref().and_then(Pred::lemma), Some("dog"));
        assert_eq!(dog.feature("num"), Some("sg"));

        let det = graph.node(NodeId(20)).expect("node 20");
        assert_eq!(det.gpred(), Some("def_q"));

        assert_eq!(graph.edges[0].arg_label(), "RSTR_H");
    }

    #[test]
    fn dump_load_round_trip_is_stable() {
        let graph = load(SAMPLE).expect("load");
        let once = dump(&graph);
        let twice = dump(&load(&once).expect("reload"));
        assert_eq!(once, twice);
    }

    #[test]
    fn dump_sorts_nodes_and_edges() {
        let input = concat!(
            r#"<dmrs cfrom="0" cto="5">"#,
            r#"<node nodeid="30" cfrom="0" cto="1"><gpred>b</gpred></node>"#,
            r#"<node nodeid="10" cfrom="0" cto="1"><gpred>a</gpred></node>"#,
            r#"<link from="30" to="10"><rargname>ARG1</rargname><post>NEQ</post></link>"#,
            r#"<link from="10" to="30"><rargname>ARG1</rargname><post>NEQ</post></link>"#,
            "</dmrs>"
        );
        let out = dump(&load(input).expect("load"));
        let pos10 = out.find(r#"nodeid="10""#).expect("node 10");
        let pos30 = out.find(r#"nodeid="30""#).expect("node 30");
        assert!(pos10 < pos30);
        let edge_a = out.find(r#"<link from="10""#).expect("edge from 10");
        let edge_b = out.find(r#"<link from="30""#).expect("edge from 30");
        assert!(edge_a < edge_b);
    }

    #[test]
    fn unknown_attributes_round_trip() {
        let input = concat!(
            r#"<dmrs cfrom="0" cto="5" surface="yes">"#,
            r#"<node nodeid="10" cfrom="0" cto="1" base="dog"><gpred>x</gpred></node>"#,
            "</dmrs>"
        );
        let graph = load(input).expect("load");
        assert_eq!(graph.attr("surface"), Some("yes"));
        assert_eq!(
            graph.nodes[0].extra.get("base").map(String::as_str),
            Some("dog")
        );
        let out = dump(&graph);
        assert!(out.contains(r#"surface="yes""#));
        assert!(out.contains(r#"base="dog""#));
    }

    #[test]
    fn tokalign_sentinel_and_list() {
        let input = concat!(
            r#"<dmrs cfrom="0" cto="5">"#,
            r#"<node nodeid="10" cfrom="0" cto="1" tokalign="-1"><gpred>x</gpred></node>"#,
            r#"<node nodeid="20" cfrom="2" cto="4" tokalign="1 2"><gpred>y</gpred></node>"#,
            "</dmrs>"
        );
        let graph = load(input).expect("load");
        assert_eq!(
            graph.node(NodeId(10)).expect("n10").aligned_tokens(),
            &[] as &[usize]
        );
        assert_eq!(
            graph.node(NodeId(20)).expect("n20").aligned_tokens(),
            &[1, 2]
        );
        let out = dump(&graph);
        assert!(out.contains(r#"tokalign="-1""#));
        assert!(out.contains(r#"tokalign="1 2""#));
    }

    #[test]
    fn ghost_link_is_allowed() {
        let input = concat!(
            r#"<dmrs cfrom="0" cto="5">"#,
            r#"<node nodeid="10" cfrom="0" cto="1"><gpred>x</gpred></node>"#,
            r#"<link from="0" to="10"><post>H</post></link>"#,
            "</dmrs>"
        );
        let graph = load(input).expect("load");
        assert_eq!(graph.edges[0].from, NodeId::GHOST);
    }

    #[test]
    fn dangling_link_is_rejected() {
        let input = concat!(
            r#"<dmrs cfrom="0" cto="5">"#,
            r#"<node nodeid="10" cfrom="0" cto="1"><gpred>x</gpred></node>"#,
            r#"<link from="10" to="99"><rargname>ARG1</rargname><post>NEQ</post></link>"#,
            "</dmrs>"
        );
        let err = load(input).expect_err("should fail");
        assert_eq!(err.error_code(), "E2001");
    }

    #[test]
    fn missing_nodeid_is_rejected() {
        let input = r#"<dmrs cfrom="0" cto="5"><node cfrom="0" cto="1"/></dmrs>"#;
        let err = load(input).expect_err("should fail");
        assert_eq!(err.error_code(), "E3002");
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let err = load("<dmrs cfrom=").expect_err("should fail");
        assert_eq!(err.error_code(), "E3001");
    }

    #[test]
    fn empty_graph_loads_and_dumps() {
        let graph = load("<dmrs cfrom=\"-1\" cto=\"-1\"></dmrs>").expect("load");
        assert!(graph.is_empty());
        let out = dump(&graph);
        assert!(load(&out).expect("reload").is_empty());
    }

    #[test]
    fn split_stream_separates_graphs() {
        let stream = "  <dmrs a=\"1\"></dmrs>\n\n<dmrs a=\"2\"></dmrs>\n";
        let chunks = split_stream(stream);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("<dmrs a=\"1\""));
        assert!(chunks[1].starts_with("<dmrs a=\"2\""));
    }

    #[test]
    fn escaped_content_round_trips() {
        let input = concat!(
            r#"<dmrs cfrom="0" cto="5">"#,
            r#"<node nodeid="10" cfrom="0" cto="1" carg="&quot;AT&amp;T&quot;"><gpred>named</gpred></node>"#,
            "</dmrs>"
        );
        let graph = load(input).expect("load");
        assert_eq!(
            graph.nodes[0].carg.as_deref(),
            Some("\"AT&T\"")
        );
        let out = dump(&graph);
        let reloaded = load(&out).expect("reload");
        assert_eq!(reloaded.nodes[0].carg, graph.nodes[0].carg);
    }
}
