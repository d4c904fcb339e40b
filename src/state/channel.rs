//! Channel roster entries.

/// A joined channel and the nicknames seen in it.
///
/// Channel names compare case-sensitively; nicknames compare with ASCII
/// case folding, the way servers treat them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    name: String,
    inhabitants: Vec<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inhabitants: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nicknames in arrival order.
    pub fn inhabitants(&self) -> &[String] {
        &self.inhabitants
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.position(nickname).is_some()
    }

    /// Returns `false` if the nickname was already present.
    pub fn add_inhabitant(&mut self, nickname: &str) -> bool {
        if nickname.is_empty() || self.contains(nickname) {
            return false;
        }
        self.inhabitants.push(nickname.to_owned());
        true
    }

    pub fn remove_inhabitant(&mut self, nickname: &str) -> bool {
        match self.position(nickname) {
            Some(index) => {
                self.inhabitants.remove(index);
                true
            }
            None => false,
        }
    }

    /// Rename an inhabitant in place, keeping its position.
    pub fn rename_inhabitant(&mut self, old: &str, new: &str) -> bool {
        match self.position(old) {
            Some(index) => {
                self.inhabitants[index] = new.to_owned();
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_inhabitants(&mut self) {
        self.inhabitants.clear();
    }

    fn position(&self, nickname: &str) -> Option<usize> {
        self.inhabitants
            .iter()
            .position(|n| n.eq_ignore_ascii_case(nickname))
    }
}
