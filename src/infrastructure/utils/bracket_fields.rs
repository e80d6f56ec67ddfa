use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]+)((?:\[[^\[\]]*\])*)$").expect("valid key pattern"));
static SEGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("valid segment pattern"));

#[derive(Debug)]
enum Node {
    Empty,
    Value(String),
    Values(Vec<String>),
    /// Children in submission order; keys are indices or mapping keys.
    Tree(Vec<(String, Node)>),
}

impl Node {
    fn insert(&mut self, path: &[String], value: String) {
        let Some((head, rest)) = path.split_first() else {
            *self = match std::mem::replace(self, Node::Empty) {
                Node::Empty => Node::Value(value),
                Node::Value(first) => Node::Values(vec![first, value]),
                Node::Values(mut all) => {
                    all.push(value);
                    Node::Values(all)
                }
                tree @ Node::Tree(_) => {
                    tracing::debug!("Ignoring scalar submitted over nested field");
                    tree
                }
            };
            return;
        };

        if matches!(self, Node::Empty) {
            *self = Node::Tree(Vec::new());
        }
        let Node::Tree(children) = self else {
            tracing::debug!("Ignoring nested key submitted over scalar field");
            return;
        };

        // `field[]` with an empty value is the "clear this list" tombstone;
        // `field[]` with a value appends at the next index.
        if head.is_empty() {
            if rest.is_empty() && value.is_empty() {
                return;
            }
            let key = children.len().to_string();
            let mut child = Node::Empty;
            child.insert(rest, value);
            children.push((key, child));
            return;
        }

        match children.iter_mut().find(|(k, _)| k == head) {
            Some((_, child)) => child.insert(rest, value),
            None => {
                let mut child = Node::Empty;
                child.insert(rest, value);
                children.push((head.clone(), child));
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Node::Empty => Value::Null,
            Node::Value(v) => Value::String(v),
            Node::Values(vs) => Value::Array(vs.into_iter().map(Value::String).collect()),
            Node::Tree(children) => {
                let indexed = children.iter().all(|(k, _)| k.parse::<usize>().is_ok());
                if indexed {
                    let mut items: Vec<(usize, Node)> = children
                        .into_iter()
                        .filter_map(|(k, node)| k.parse::<usize>().ok().map(|i| (i, node)))
                        .collect();
                    items.sort_by_key(|(i, _)| *i);
                    Value::Array(items.into_iter().map(|(_, node)| node.into_value()).collect())
                } else {
                    Value::Object(
                        children
                            .into_iter()
                            .map(|(k, node)| (k, node.into_value()))
                            .collect(),
                    )
                }
            }
        }
    }
}

fn split_key(key: &str) -> Vec<String> {
    match KEY_PATTERN.captures(key) {
        Some(caps) => {
            let mut path = vec![caps[1].to_string()];
            path.extend(
                SEGMENT_PATTERN
                    .captures_iter(&caps[2])
                    .map(|seg| seg[1].to_string()),
            );
            path
        }
        None => vec![key.to_string()],
    }
}

/// Rebuilds nested arrays and objects from bracket-notation form keys.
///
/// `features[0]`, `features[1]` become an array ordered by index, `socialLinks[github]`
/// becomes an object, `images[0][url]` an array of objects, and a repeated plain key
/// collects its values into an array. `field[]` with an empty value yields an empty array.
pub fn reconstruct<I>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut root = Node::Tree(Vec::new());
    for (key, value) in entries {
        let path = split_key(&key);
        root.insert(&path, value);
    }

    match root {
        Node::Tree(children) => children
            .into_iter()
            .map(|(k, node)| (k, node.into_value()))
            .collect(),
        _ => Map::new(),
    }
}
