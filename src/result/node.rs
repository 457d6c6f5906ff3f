use crate::result::table::ResultTable;
use crate::spreadsheet::CellValue;
use indexmap::IndexMap;
use std::ops::Index;

/// Key under which range-level patterns record their metadata.
pub const META_KEY: &str = "__meta";

/// Metadata recorded by range-level patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Meta {
    /// Absolute window matched by a `Range`
    Range {
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
    },
    /// Name of the sheet matched by a `Sheet`
    Sheet { name: String },
    /// Name of the `FlexibleRange` whose window was discovered
    Flexible { name: String },
}

/// Named children, duplicate names disambiguated by suffixing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultDict {
    pub name: String,
    pub entries: IndexMap<String, ResultNode>,
}

impl ResultDict {
    pub fn new(name: &str) -> Self {
        ResultDict {
            name: name.to_owned(),
            entries: IndexMap::new(),
        }
    }

    /// Inserts `value` under `name`, or `name_1`, `name_2`, ... when taken.
    pub fn add(&mut self, name: &str, value: ResultNode) {
        let mut key = name.to_owned();
        let mut suffix = 0;
        while self.entries.contains_key(&key) {
            suffix += 1;
            key = format!("{name}_{suffix}");
        }
        self.entries.insert(key, value);
    }
}

/// Positionally repeated children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultList {
    pub name: String,
    pub items: Vec<ResultNode>,
}

impl ResultList {
    pub fn new(name: &str) -> Self {
        ResultList {
            name: name.to_owned(),
            items: Vec::new(),
        }
    }
}

/// Multi-map from pattern name to every match with that name, in match order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultGroup {
    pub name: String,
    pub entries: IndexMap<String, Vec<ResultNode>>,
}

impl ResultGroup {
    pub fn new(name: &str) -> Self {
        ResultGroup {
            name: name.to_owned(),
            entries: IndexMap::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: ResultNode) {
        self.entries.entry(name.to_owned()).or_default().push(value);
    }

    /// Appends every entry of `other` after the matches already recorded.
    pub fn extend(&mut self, other: ResultGroup) {
        for (name, values) in other.entries {
            self.entries.entry(name).or_default().extend(values);
        }
    }
}

/// Values of a matched line after its line transforms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultLine {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl ResultLine {
    pub fn new(name: &str) -> Self {
        ResultLine {
            name: name.to_owned(),
            values: Vec::new(),
        }
    }
}

/// A node of the result tree.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultNode {
    Dict(ResultDict),
    List(ResultList),
    Group(ResultGroup),
    Line(ResultLine),
    Table(ResultTable),
    Meta(Meta),
}

impl ResultNode {
    /// Name of the pattern that produced this node.
    pub fn name(&self) -> &str {
        match self {
            ResultNode::Dict(dict) => &dict.name,
            ResultNode::List(list) => &list.name,
            ResultNode::Group(group) => &group.name,
            ResultNode::Line(line) => &line.name,
            ResultNode::Table(table) => &table.name,
            ResultNode::Meta(_) => META_KEY,
        }
    }

    /// Returns the child named `key`. For groups, the first match with that name.
    pub fn get(&self, key: &str) -> Option<&ResultNode> {
        match self {
            ResultNode::Dict(dict) => dict.entries.get(key),
            ResultNode::Group(group) => group.entries.get(key).and_then(|values| values.first()),
            _ => None,
        }
    }

    /// Returns every child recorded for `key`: suffixed duplicates of a dict
    /// (`key`, `key_1`, ...) or every match of a group.
    pub fn get_all(&self, key: &str) -> Vec<&ResultNode> {
        match self {
            ResultNode::Dict(dict) => {
                let mut values: Vec<&ResultNode> = dict.entries.get(key).into_iter().collect();
                let mut suffix = 1;
                while let Some(value) = dict.entries.get(&format!("{key}_{suffix}")) {
                    values.push(value);
                    suffix += 1;
                }
                values
            }
            ResultNode::Group(group) => group
                .entries
                .get(key)
                .map(|values| values.iter().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Returns the child at `index` of a list.
    pub fn at(&self, index: usize) -> Option<&ResultNode> {
        match self {
            ResultNode::List(list) => list.items.get(index),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&ResultLine> {
        match self {
            ResultNode::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&ResultTable> {
        match self {
            ResultNode::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_meta(&self) -> Option<&Meta> {
        match self {
            ResultNode::Meta(meta) => Some(meta),
            _ => None,
        }
    }

    /// Number of children, values or data rows.
    pub fn len(&self) -> usize {
        match self {
            ResultNode::Dict(dict) => dict.entries.len(),
            ResultNode::List(list) => list.items.len(),
            ResultNode::Group(group) => group.entries.len(),
            ResultNode::Line(line) => line.values.len(),
            ResultNode::Table(table) => table.data.len(),
            ResultNode::Meta(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child names of a dict or group, in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            ResultNode::Dict(dict) => dict.entries.keys().map(String::as_str).collect(),
            ResultNode::Group(group) => group.entries.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl Index<&str> for ResultNode {
    type Output = ResultNode;

    fn index(&self, key: &str) -> &Self::Output {
        self.get(key)
            .unwrap_or_else(|| panic!("no result named '{key}' in '{}'", self.name()))
    }
}

impl Index<usize> for ResultNode {
    type Output = ResultNode;

    fn index(&self, index: usize) -> &Self::Output {
        self.at(index)
            .unwrap_or_else(|| panic!("no result at index {index} in '{}'", self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, values: &[i32]) -> ResultNode {
        ResultNode::Line(ResultLine {
            name: name.to_owned(),
            values: values.iter().map(|value| CellValue::from(*value)).collect(),
        })
    }

    #[test]
    fn dict_suffixes_duplicate_names() {
        let mut dict = ResultDict::new("root");
        dict.add("line", line("line", &[1]));
        dict.add("line", line("line", &[2]));
        dict.add("line", line("line", &[3]));
        let node = ResultNode::Dict(dict);
        assert_eq!(node.keys(), vec!["line", "line_1", "line_2"]);
        assert_eq!(node["line_1"], line("line", &[2]));
        assert_eq!(node.get_all("line").len(), 3);
    }

    #[test]
    fn group_accumulates_and_extends() {
        let mut group = ResultGroup::new("root");
        group.push("t", line("t", &[1]));
        let mut other = ResultGroup::new("many");
        other.push("t", line("t", &[2]));
        other.push("u", line("u", &[3]));
        group.extend(other);
        let node = ResultNode::Group(group);
        assert_eq!(node.keys(), vec!["t", "u"]);
        assert_eq!(node.get_all("t"), vec![&line("t", &[1]), &line("t", &[2])]);
        assert_eq!(node["t"], line("t", &[1]));
    }

    #[test]
    fn list_indexing() {
        let node = ResultNode::List(ResultList {
            name: "many".to_owned(),
            items: vec![line("line", &[1]), line("line", &[2])],
        });
        assert_eq!(node.len(), 2);
        assert_eq!(node[1], line("line", &[2]));
        assert!(node.at(2).is_none());
        assert!(node.get("line").is_none());
    }

    #[test]
    #[should_panic(expected = "no result named 'missing'")]
    fn index_panics_on_missing_key() {
        let node = ResultNode::Dict(ResultDict::new("root"));
        let _ = &node["missing"];
    }
}
