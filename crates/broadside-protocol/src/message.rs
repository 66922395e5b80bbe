//! The untyped wire envelope: a command word plus a key/value bag.

/// One protocol message as it exists on the wire.
///
/// ```text
/// ATTACK:x=3;y=4
/// └─┬──┘ └──┬───┘
///  kind    data
/// ```
///
/// Keys are unique; inserting an existing key replaces its value. Fields
/// keep insertion order so encoding is deterministic, but equality ignores
/// order, matching the protocol where field order carries no meaning.
///
/// This type only lives at the edge. Everything above the connection
/// handler works with [`ClientCommand`](crate::ClientCommand) and
/// [`ServerEvent`](crate::ServerEvent).
#[derive(Debug, Clone, Eq)]
pub struct Message {
    kind: String,
    data: Vec<(String, String)>,
}

impl Message {
    /// Creates a message with no fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: Vec::new(),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.data.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.data.push((key, value)),
        }
    }

    /// The command word, e.g. `"ATTACK"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Looks up a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.data.len() == other.data.len()
            && self.fields().all(|(k, v)| other.get(k) == Some(v))
    }
}
