use crate::error::SheetParserError;
use crate::result::node::{ResultDict, ResultGroup, ResultLine, ResultList, ResultNode};
use crate::result::table::ResultTable;
use crate::result::FrameKind;

/// Strategy deciding how frames are created and merged into their parent.
pub trait CommitPolicy: Send {
    /// Creates the node backing a newly pushed frame.
    fn open(&self, name: &str, kind: FrameKind) -> ResultNode;

    /// Merges a successfully matched frame into its parent.
    fn commit(&self, parent: &mut ResultNode, child: ResultNode) -> Result<(), SheetParserError>;

    /// Adds a value to a frame without opening a nested scope.
    fn emit(&self, parent: &mut ResultNode, name: &str, value: ResultNode) -> Result<(), SheetParserError>;
}

fn leaf_frame(name: &str, kind: FrameKind) -> Option<ResultNode> {
    match kind {
        FrameKind::Line => Some(ResultNode::Line(ResultLine::new(name))),
        FrameKind::Table => Some(ResultNode::Table(ResultTable::new(name))),
        FrameKind::Dict | FrameKind::List => None,
    }
}

fn not_a_container(parent: &ResultNode) -> SheetParserError {
    SheetParserError::configuration(format!(
        "'{}' cannot hold nested results",
        parent.name()
    ))
}

/// Mirrors the pattern tree: dicts keyed by pattern name, lists for repetitions.
#[derive(Copy, Clone, Debug, Default)]
pub struct ObjectTreePolicy;

impl CommitPolicy for ObjectTreePolicy {
    fn open(&self, name: &str, kind: FrameKind) -> ResultNode {
        leaf_frame(name, kind).unwrap_or_else(|| match kind {
            FrameKind::List => ResultNode::List(ResultList::new(name)),
            _ => ResultNode::Dict(ResultDict::new(name)),
        })
    }

    fn commit(&self, parent: &mut ResultNode, child: ResultNode) -> Result<(), SheetParserError> {
        let name = child.name().to_owned();
        self.emit(parent, &name, child)
    }

    fn emit(&self, parent: &mut ResultNode, name: &str, value: ResultNode) -> Result<(), SheetParserError> {
        match parent {
            ResultNode::Dict(dict) => dict.add(name, value),
            ResultNode::List(list) => list.items.push(value),
            ResultNode::Group(group) => group.push(name, value),
            _ => return Err(not_a_container(parent)),
        }
        Ok(())
    }
}

/// Flattens dicts and lists into multi-maps from pattern name to matches.
/// A committed group merges its entries into the parent group.
#[derive(Copy, Clone, Debug, Default)]
pub struct GroupedPolicy;

impl CommitPolicy for GroupedPolicy {
    fn open(&self, name: &str, kind: FrameKind) -> ResultNode {
        leaf_frame(name, kind).unwrap_or_else(|| ResultNode::Group(ResultGroup::new(name)))
    }

    fn commit(&self, parent: &mut ResultNode, child: ResultNode) -> Result<(), SheetParserError> {
        match (parent, child) {
            (ResultNode::Group(parent), ResultNode::Group(child)) => {
                parent.extend(child);
                Ok(())
            }
            (parent, child) => {
                let name = child.name().to_owned();
                self.emit(parent, &name, child)
            }
        }
    }

    fn emit(&self, parent: &mut ResultNode, name: &str, value: ResultNode) -> Result<(), SheetParserError> {
        match parent {
            ResultNode::Group(group) => {
                group.push(name, value);
                Ok(())
            }
            _ => Err(not_a_container(parent)),
        }
    }
}
