//! Annotation graph records and their containers
//!
//! Every representative is built into its own [`Subgraph`] with local ids.
//! The coordinator is the only writer of the shared [`AnnotationGraph`]: it
//! merges finished subgraphs in submission order, so the ids a record ends
//! up with never depend on which worker finished first.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use super::offsets::TextRange;
use crate::capture::TimeUnit;
use crate::vision::PixelBox;

/// Reference to a record while a subgraph is being built
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// Index into the subgraph's own records
    Local(usize),
    /// Record that already exists in the input annotation set
    External(String),
}

/// Span kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpanKind {
    Paragraph,
    Sentence,
    Token,
}

/// Paragraph or sentence: aggregates child spans
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate<I> {
    pub document: I,
    /// Full rendering of the block or line, dropped words included. Not the
    /// slice of `range`, which only covers the accepted children.
    pub text: String,
    /// Covers all children; absent while no child has been attached
    #[serde(flatten)]
    pub range: Option<TextRange>,
    pub targets: Vec<I>,
}

/// Leaf span over one recognized word
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token<I> {
    pub document: I,
    pub text: String,
    #[serde(flatten)]
    pub range: TextRange,
    pub confidence: f32,
}

/// Character-offset region over a text document
#[derive(Debug, Clone, PartialEq)]
pub enum Span<I> {
    Paragraph(Aggregate<I>),
    Sentence(Aggregate<I>),
    Token(Token<I>),
}

impl<I> Span<I> {
    pub fn kind(&self) -> SpanKind {
        match self {
            Span::Paragraph(_) => SpanKind::Paragraph,
            Span::Sentence(_) => SpanKind::Sentence,
            Span::Token(_) => SpanKind::Token,
        }
    }

    pub fn range(&self) -> Option<TextRange> {
        match self {
            Span::Paragraph(a) | Span::Sentence(a) => a.range,
            Span::Token(t) => Some(t.range),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Span::Paragraph(a) | Span::Sentence(a) => &a.text,
            Span::Token(t) => &t.text,
        }
    }

    pub fn document(&self) -> &I {
        match self {
            Span::Paragraph(a) | Span::Sentence(a) => &a.document,
            Span::Token(t) => &t.document,
        }
    }

    /// Child ids; always empty for tokens
    pub fn targets(&self) -> &[I] {
        match self {
            Span::Paragraph(a) | Span::Sentence(a) => &a.targets,
            Span::Token(_) => &[],
        }
    }

    fn aggregate_mut(&mut self) -> Option<&mut Aggregate<I>> {
        match self {
            Span::Paragraph(a) | Span::Sentence(a) => Some(a),
            Span::Token(_) => None,
        }
    }

    fn map_ids<J>(self, f: &mut impl FnMut(I) -> J) -> Span<J> {
        match self {
            Span::Paragraph(a) => Span::Paragraph(a.map_ids(f)),
            Span::Sentence(a) => Span::Sentence(a.map_ids(f)),
            Span::Token(t) => Span::Token(Token {
                document: f(t.document),
                text: t.text,
                range: t.range,
                confidence: t.confidence,
            }),
        }
    }
}

impl<I> Aggregate<I> {
    fn map_ids<J>(self, f: &mut impl FnMut(I) -> J) -> Aggregate<J> {
        Aggregate {
            document: f(self.document),
            text: self.text,
            range: self.range,
            targets: self.targets.into_iter().map(|t| f(t)).collect(),
        }
    }
}

/// Pixel rectangle for one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub label: String,
    pub coordinates: PixelBox,
}

/// Identity-only directed edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alignment<I> {
    pub source: I,
    pub target: I,
}

/// Time point synthesised for a segment without representatives
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePointRecord {
    pub time_point: f64,
    pub time_unit: TimeUnit,
}

/// Anything the annotator writes to the graph
///
/// Serialized as `{"@type": <type name>, "properties": {..}}`, where the type
/// name is the same one listed in the graph's `contains`.
#[derive(Debug, Clone, PartialEq)]
pub enum Record<I> {
    TextDocument { text: String },
    Span(Span<I>),
    BoundingBox(BoundingBox),
    Alignment(Alignment<I>),
    TimePoint(TimePointRecord),
}

impl<I> Record<I> {
    /// Type name used in the graph's `contains` list
    pub fn type_name(&self) -> &'static str {
        match self {
            Record::TextDocument { .. } => "TextDocument",
            Record::Span(s) => match s.kind() {
                SpanKind::Paragraph => "Paragraph",
                SpanKind::Sentence => "Sentence",
                SpanKind::Token => "Token",
            },
            Record::BoundingBox(_) => "BoundingBox",
            Record::Alignment(_) => "Alignment",
            Record::TimePoint(_) => "TimePoint",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            Record::TextDocument { .. } => "td",
            Record::Span(s) => match s.kind() {
                SpanKind::Paragraph => "pg",
                SpanKind::Sentence => "st",
                SpanKind::Token => "tk",
            },
            Record::BoundingBox(_) => "bb",
            Record::Alignment(_) => "al",
            Record::TimePoint(_) => "tp",
        }
    }

    pub fn as_span(&self) -> Option<&Span<I>> {
        match self {
            Record::Span(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_alignment(&self) -> Option<&Alignment<I>> {
        match self {
            Record::Alignment(a) => Some(a),
            _ => None,
        }
    }

    fn map_ids<J>(self, mut f: impl FnMut(I) -> J) -> Record<J> {
        match self {
            Record::TextDocument { text } => Record::TextDocument { text },
            Record::Span(s) => Record::Span(s.map_ids(&mut f)),
            Record::BoundingBox(b) => Record::BoundingBox(b),
            Record::Alignment(a) => Record::Alignment(Alignment {
                source: f(a.source),
                target: f(a.target),
            }),
            Record::TimePoint(t) => Record::TimePoint(t),
        }
    }
}

impl<I: Serialize> Serialize for Record<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct DocumentProperties<'a> {
            text: &'a str,
        }

        let mut record = serializer.serialize_struct("Record", 2)?;
        record.serialize_field("@type", self.type_name())?;
        match self {
            Record::TextDocument { text } => record.serialize_field("properties", &DocumentProperties { text })?,
            Record::Span(Span::Paragraph(a) | Span::Sentence(a)) => record.serialize_field("properties", a)?,
            Record::Span(Span::Token(t)) => record.serialize_field("properties", t)?,
            Record::BoundingBox(b) => record.serialize_field("properties", b)?,
            Record::Alignment(a) => record.serialize_field("properties", a)?,
            Record::TimePoint(t) => record.serialize_field("properties", t)?,
        }
        record.end()
    }
}

/// Insertion surface the annotation builder writes through
pub trait GraphSink {
    fn new_text_document(&mut self, text: String) -> NodeRef;
    fn new_span(&mut self, span: Span<NodeRef>) -> NodeRef;
    fn new_bounding_box(&mut self, label: &str, coordinates: PixelBox) -> NodeRef;
    fn new_alignment(&mut self, source: NodeRef, target: NodeRef) -> NodeRef;
    fn new_time_point(&mut self, time_point: f64, time_unit: TimeUnit) -> NodeRef;
    /// Attach the ordered child list to a paragraph or sentence, once
    fn set_targets(&mut self, parent: &NodeRef, targets: Vec<NodeRef>);
}

/// Records built by one task, addressed by local index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subgraph {
    records: Vec<Record<NodeRef>>,
}

impl Subgraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record<NodeRef>] {
        &self.records
    }

    pub fn get(&self, id: &NodeRef) -> Option<&Record<NodeRef>> {
        match id {
            NodeRef::Local(i) => self.records.get(*i),
            NodeRef::External(_) => None,
        }
    }

    pub fn span(&self, id: &NodeRef) -> Option<&Span<NodeRef>> {
        self.get(id).and_then(Record::as_span)
    }

    /// Spans of one kind in creation order, with their ids
    pub fn spans(&self, kind: SpanKind) -> Vec<(NodeRef, &Span<NodeRef>)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_span().filter(|s| s.kind() == kind).map(|s| (NodeRef::Local(i), s)))
            .collect()
    }

    pub fn alignments(&self) -> impl Iterator<Item = &Alignment<NodeRef>> {
        self.records.iter().filter_map(Record::as_alignment)
    }

    fn push(&mut self, record: Record<NodeRef>) -> NodeRef {
        self.records.push(record);
        NodeRef::Local(self.records.len() - 1)
    }
}

impl GraphSink for Subgraph {
    fn new_text_document(&mut self, text: String) -> NodeRef {
        self.push(Record::TextDocument { text })
    }

    fn new_span(&mut self, span: Span<NodeRef>) -> NodeRef {
        self.push(Record::Span(span))
    }

    fn new_bounding_box(&mut self, label: &str, coordinates: PixelBox) -> NodeRef {
        self.push(Record::BoundingBox(BoundingBox {
            label: label.to_string(),
            coordinates,
        }))
    }

    fn new_alignment(&mut self, source: NodeRef, target: NodeRef) -> NodeRef {
        self.push(Record::Alignment(Alignment { source, target }))
    }

    fn new_time_point(&mut self, time_point: f64, time_unit: TimeUnit) -> NodeRef {
        self.push(Record::TimePoint(TimePointRecord {
            time_point,
            time_unit,
        }))
    }

    fn set_targets(&mut self, parent: &NodeRef, targets: Vec<NodeRef>) {
        let range = targets
            .iter()
            .filter_map(|t| self.span(t).and_then(Span::range))
            .reduce(TextRange::cover);

        let NodeRef::Local(index) = parent else {
            warn!("Cannot attach targets to external record {:?}", parent);
            return;
        };
        let Some(aggregate) = self.records.get_mut(*index).and_then(|r| match r {
            Record::Span(s) => s.aggregate_mut(),
            _ => None,
        }) else {
            warn!("Record {} does not take targets", index);
            return;
        };

        if !aggregate.targets.is_empty() {
            warn!("Targets of record {} already set, keeping the first list", index);
            return;
        }
        aggregate.targets = targets;
        aggregate.range = range;
    }
}

/// One record in the merged graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub record: Record<String>,
}

/// The merged output view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationGraph {
    pub view_id: String,
    /// Record types present in the view
    pub contains: BTreeSet<&'static str>,
    pub documents: Vec<Node>,
    pub annotations: Vec<Node>,
    #[serde(skip)]
    counters: HashMap<&'static str, usize>,
}

impl AnnotationGraph {
    pub fn new(view_id: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            contains: BTreeSet::new(),
            documents: Vec::new(),
            annotations: Vec::new(),
            counters: HashMap::new(),
        }
    }

    /// Append a finished subgraph, assigning view-unique ids in record order
    pub fn merge(&mut self, subgraph: Subgraph) {
        let ids: Vec<String> = subgraph
            .records
            .iter()
            .map(|r| {
                let counter = self.counters.entry(r.id_prefix()).or_insert(0);
                *counter += 1;
                format!("{}_{}", r.id_prefix(), counter)
            })
            .collect();

        for (record, id) in subgraph.records.into_iter().zip(&ids) {
            self.contains.insert(record.type_name());
            let record = record.map_ids(|r| match r {
                NodeRef::Local(i) => ids[i].clone(),
                NodeRef::External(id) => id,
            });
            let node = Node { id: id.clone(), record };
            if matches!(node.record, Record::TextDocument { .. }) {
                self.documents.push(node);
            } else {
                self.annotations.push(node);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Record<String>> {
        self.documents
            .iter()
            .chain(&self.annotations)
            .find(|n| n.id == id)
            .map(|n| &n.record)
    }

    pub fn span(&self, id: &str) -> Option<&Span<String>> {
        self.get(id).and_then(Record::as_span)
    }

    pub fn spans(&self, kind: SpanKind) -> Vec<(&str, &Span<String>)> {
        self.annotations
            .iter()
            .filter_map(|n| n.record.as_span().filter(|s| s.kind() == kind).map(|s| (n.id.as_str(), s)))
            .collect()
    }

    pub fn alignments(&self) -> impl Iterator<Item = &Alignment<String>> {
        self.annotations.iter().filter_map(|n| n.record.as_alignment())
    }

    pub fn document_text(&self, id: &str) -> Option<&str> {
        match self.get(id) {
            Some(Record::TextDocument { text }) => Some(text),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len() + self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(doc: &NodeRef, text: &str, start: usize, end: usize) -> Span<NodeRef> {
        Span::Token(Token {
            document: doc.clone(),
            text: text.to_string(),
            range: TextRange::new(start, end),
            confidence: 0.9,
        })
    }

    fn sentence(doc: &NodeRef, text: &str) -> Span<NodeRef> {
        Span::Sentence(Aggregate {
            document: doc.clone(),
            text: text.to_string(),
            range: None,
            targets: Vec::new(),
        })
    }

    #[test]
    fn test_set_targets_covers_children() {
        let mut sub = Subgraph::new();
        let doc = sub.new_text_document("HELLO WORLD".into());
        let sent = sub.new_span(sentence(&doc, "HELLO WORLD"));
        let a = sub.new_span(token(&doc, "HELLO", 0, 5));
        let b = sub.new_span(token(&doc, "WORLD", 6, 11));

        sub.set_targets(&sent, vec![a.clone(), b.clone()]);

        let span = sub.span(&sent).unwrap();
        assert_eq!(span.targets(), &[a, b]);
        assert_eq!(span.range(), Some(TextRange::new(0, 11)));
    }

    #[test]
    fn test_set_targets_only_once() {
        let mut sub = Subgraph::new();
        let doc = sub.new_text_document("x y".into());
        let sent = sub.new_span(sentence(&doc, "x y"));
        let a = sub.new_span(token(&doc, "x", 0, 1));
        let b = sub.new_span(token(&doc, "y", 2, 3));

        sub.set_targets(&sent, vec![a.clone()]);
        sub.set_targets(&sent, vec![b]);

        assert_eq!(sub.span(&sent).unwrap().targets(), &[a]);
    }

    #[test]
    fn test_set_targets_ignores_tokens() {
        let mut sub = Subgraph::new();
        let doc = sub.new_text_document("x".into());
        let tok = sub.new_span(token(&doc, "x", 0, 1));

        sub.set_targets(&tok, vec![doc.clone()]);
        assert!(sub.span(&tok).unwrap().targets().is_empty());
    }

    #[test]
    fn test_merge_assigns_ids_in_order() {
        let mut graph = AnnotationGraph::new("v_1");

        for text in ["first", "second"] {
            let mut sub = Subgraph::new();
            let doc = sub.new_text_document(text.to_string());
            sub.new_alignment(NodeRef::External("v_0:tp_1".into()), doc);
            graph.merge(sub);
        }

        assert_eq!(graph.document_text("td_1"), Some("first"));
        assert_eq!(graph.document_text("td_2"), Some("second"));
        let edges: Vec<_> = graph.alignments().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].source, "v_0:tp_1");
        assert_eq!(edges[1].target, "td_2");
        assert!(graph.contains.contains("Alignment"));
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_merge_rewrites_targets() {
        let mut sub = Subgraph::new();
        let doc = sub.new_text_document("HELLO".into());
        let sent = sub.new_span(sentence(&doc, "HELLO"));
        let tok = sub.new_span(token(&doc, "HELLO", 0, 5));
        sub.set_targets(&sent, vec![tok]);

        let mut graph = AnnotationGraph::new("v_1");
        graph.merge(sub);

        let span = graph.span("st_1").unwrap();
        assert_eq!(span.targets(), &["tk_1".to_string()]);
        assert_eq!(span.document(), "td_1");
    }

    #[test]
    fn test_graph_serializes_with_types() {
        let mut sub = Subgraph::new();
        let doc = sub.new_text_document("HELLO".into());
        sub.new_span(token(&doc, "HELLO", 0, 5));
        let mut graph = AnnotationGraph::new("v_1");
        graph.merge(sub);

        let json = serde_json::to_value(&graph).unwrap();
        let token = &json["annotations"][0];
        assert_eq!(token["id"], "tk_1");
        assert_eq!(token["@type"], "Token");
        assert!(token["properties"].get("kind").is_none());
        assert_eq!(token["properties"]["start"], 0);
        assert_eq!(token["properties"]["end"], 5);
        assert_eq!(json["documents"][0]["properties"]["text"], "HELLO");
    }

    #[test]
    fn test_contains_matches_record_types() {
        let mut sub = Subgraph::new();
        let doc = sub.new_text_document("HELLO".into());
        let sent = sub.new_span(sentence(&doc, "HELLO"));
        let tok = sub.new_span(token(&doc, "HELLO", 0, 5));
        sub.set_targets(&sent, vec![tok.clone()]);
        let bb = sub.new_bounding_box("text", PixelBox { x1: 0, y1: 0, x2: 4, y2: 2 });
        sub.new_alignment(tok, bb);
        sub.new_time_point(500.0, TimeUnit::Milliseconds);
        let mut graph = AnnotationGraph::new("v_1");
        graph.merge(sub);

        let json = serde_json::to_value(&graph).unwrap();
        let types: BTreeSet<&str> = json["documents"]
            .as_array()
            .unwrap()
            .iter()
            .chain(json["annotations"].as_array().unwrap())
            .map(|n| n["@type"].as_str().unwrap())
            .collect();
        let contains: BTreeSet<&str> = json["contains"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t.as_str().unwrap())
            .collect();

        assert_eq!(types, contains);
        assert!(types.contains("Sentence"));
        assert_eq!(json["annotations"][0]["properties"]["targets"][0], "tk_1");
        assert_eq!(json["annotations"][2]["properties"]["coordinates"][1][0], 4);
        assert_eq!(json["annotations"][4]["properties"]["timeUnit"], "milliseconds");
    }
}
