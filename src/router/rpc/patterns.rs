//! Contains the `RegistrationPatternNode` struct, which is used for constructing a trie corresponding
//! to pattern based registration
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex};

use itertools::Itertools;

use crate::messages::Reason;
use crate::{MatchingPolicy, ID, URI};

use super::super::{random_id, ConnectionInfo};

/// Contains a trie corresponding to the registration patterns that connections have requested.
///
/// Each level of the trie corresponds to a fragment of a uri between the '.' character.
/// Thus each registration that starts with 'com' for example will be grouped together.
/// Registrations can be added and removed, and the registrant that matches a particular URI
/// can be looked up using the `get_registrant_for()` method. Only one registration may occupy
/// a given pattern at a time; a second attempt fails with `ProcedureAlreadyExists`.
pub struct RegistrationPatternNode<P: PatternData> {
    edges: HashMap<String, RegistrationPatternNode<P>>,
    connections: ProcdureCollection<P>,
    prefix_connections: ProcdureCollection<P>,
    id: ID,
    prefix_id: ID,
}

/// Represents data that a pattern trie will hold
pub trait PatternData {
    fn get_id(&self) -> ID;
}

struct DataWrapper<P: PatternData> {
    registrant: P,
    policy: MatchingPolicy,
}

struct ProcdureCollection<P: PatternData> {
    procedure: Option<DataWrapper<P>>,
}

/// Represents an error caused during adding or removing patterns
#[derive(Debug)]
pub struct PatternError {
    reason: Reason,
}

impl PatternError {
    #[inline]
    pub fn new(reason: Reason) -> PatternError {
        PatternError { reason }
    }

    pub fn reason(self) -> Reason {
        self.reason
    }
}

impl PatternData for Arc<Mutex<ConnectionInfo>> {
    fn get_id(&self) -> ID {
        self.lock().unwrap().id
    }
}

impl<P: PatternData> Debug for RegistrationPatternNode<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_with_indent(f, 0)
    }
}

impl<P: PatternData> Default for RegistrationPatternNode<P> {
    fn default() -> RegistrationPatternNode<P> {
        RegistrationPatternNode::new()
    }
}

impl<P: PatternData> ProcdureCollection<P> {
    fn add_procedure(
        &mut self,
        registrant: P,
        matching_policy: MatchingPolicy,
    ) -> Result<(), PatternError> {
        if self.procedure.is_some() {
            return Err(PatternError::new(Reason::ProcedureAlreadyExists));
        }
        self.procedure = Some(DataWrapper {
            registrant,
            policy: matching_policy,
        });
        Ok(())
    }

    fn remove_procedure(&mut self, registrant_id: ID) {
        if matches!(&self.procedure, Some(wrapper) if wrapper.registrant.get_id() == registrant_id)
        {
            self.procedure = None;
        }
    }

    fn get_entry(&self) -> Option<&DataWrapper<P>> {
        self.procedure.as_ref()
    }
}

impl<P: PatternData> RegistrationPatternNode<P> {
    fn fmt_with_indent(&self, f: &mut Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(
            f,
            "{} pre: {:?} subs: {:?}",
            self.id,
            self.prefix_connections
                .procedure
                .iter()
                .map(|sub| sub.registrant.get_id())
                .join(","),
            self.connections
                .procedure
                .iter()
                .map(|sub| sub.registrant.get_id())
                .join(",")
        )?;
        for (chunk, node) in &self.edges {
            for _ in 0..indent * 2 {
                write!(f, "  ")?;
            }
            write!(f, "{} - ", chunk)?;
            node.fmt_with_indent(f, indent + 1)?;
        }
        Ok(())
    }

    /// Add a new registration to the pattern trie with the given pattern and matching policy.
    pub fn register_with(
        &mut self,
        topic: &URI,
        registrant: P,
        matching_policy: MatchingPolicy,
    ) -> Result<ID, PatternError> {
        let mut uri_bits = topic.uri.split('.');
        let initial = match uri_bits.next() {
            Some(initial) => initial,
            None => return Err(PatternError::new(Reason::InvalidURI)),
        };
        let edge = self
            .edges
            .entry(initial.to_string())
            .or_insert_with(RegistrationPatternNode::new);
        edge.add_registration(uri_bits, registrant, matching_policy)
    }

    /// Removes a registration from the pattern trie.
    pub fn unregister_with(
        &mut self,
        topic: &str,
        registrant: &P,
        is_prefix: bool,
    ) -> Result<ID, PatternError> {
        let uri_bits = topic.split('.');
        self.remove_registration(uri_bits, registrant.get_id(), is_prefix)
    }

    /// Gets the registrant that matches the given uri
    pub fn get_registrant_for(
        &self,
        procedure: URI,
    ) -> Result<(&P, ID, MatchingPolicy), PatternError> {
        let wrapper = self.find_registrant(&procedure.uri.split('.').collect::<Vec<&str>>(), 0);
        match wrapper {
            Some((data, id)) => Ok((&data.registrant, id, data.policy)),
            None => Err(PatternError::new(Reason::NoSuchProcedure)),
        }
    }

    /// Constructs a new RegistrationPatternNode to be used as the root of the trie
    #[inline]
    pub fn new() -> RegistrationPatternNode<P> {
        RegistrationPatternNode {
            edges: HashMap::new(),
            connections: ProcdureCollection { procedure: None },
            prefix_connections: ProcdureCollection { procedure: None },
            id: random_id(),
            prefix_id: random_id(),
        }
    }

    fn add_registration<'a, I>(
        &mut self,
        mut uri_bits: I,
        registrant: P,
        matching_policy: MatchingPolicy,
    ) -> Result<ID, PatternError>
    where
        I: Iterator<Item = &'a str>,
    {
        match uri_bits.next() {
            Some(uri_bit) => {
                if uri_bit.is_empty() && matching_policy != MatchingPolicy::Wildcard {
                    return Err(PatternError::new(Reason::InvalidURI));
                }
                let edge = self
                    .edges
                    .entry(uri_bit.to_string())
                    .or_insert_with(RegistrationPatternNode::new);
                edge.add_registration(uri_bits, registrant, matching_policy)
            }
            None => {
                if matching_policy == MatchingPolicy::Prefix {
                    self.prefix_connections
                        .add_procedure(registrant, matching_policy)?;
                    Ok(self.prefix_id)
                } else {
                    self.connections
                        .add_procedure(registrant, matching_policy)?;
                    Ok(self.id)
                }
            }
        }
    }

    fn remove_registration<'a, I>(
        &mut self,
        mut uri_bits: I,
        registrant_id: u64,
        is_prefix: bool,
    ) -> Result<ID, PatternError>
    where
        I: Iterator<Item = &'a str>,
    {
        match uri_bits.next() {
            Some(uri_bit) => {
                if let Some(edge) = self.edges.get_mut(uri_bit) {
                    let result = edge.remove_registration(uri_bits, registrant_id, is_prefix);
                    if edge.is_empty() {
                        self.edges.remove(uri_bit);
                    }
                    result
                } else {
                    Err(PatternError::new(Reason::InvalidURI))
                }
            }
            None => {
                if is_prefix {
                    self.prefix_connections.remove_procedure(registrant_id);
                    Ok(self.prefix_id)
                } else {
                    self.connections.remove_procedure(registrant_id);
                    Ok(self.id)
                }
            }
        }
    }

    /// Whether this node holds no registration of its own and has no
    /// children left, i.e. it can be pruned from its parent's `edges`.
    fn is_empty(&self) -> bool {
        self.connections.procedure.is_none()
            && self.prefix_connections.procedure.is_none()
            && self.edges.is_empty()
    }

    #[cfg(test)]
    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn find_registrant(&self, uri_bits: &[&str], depth: usize) -> Option<(&DataWrapper<P>, ID)> {
        if depth == uri_bits.len() {
            if let Some(registrant) = self.connections.get_entry() {
                Some((registrant, self.id))
            } else if let Some(registrant) = self.prefix_connections.get_entry() {
                Some((registrant, self.prefix_id))
            } else {
                None
            }
        } else if let Some((registrant, id)) = self.recurse(uri_bits, depth) {
            Some((registrant, id))
        } else if let Some(registrant) = self.prefix_connections.get_entry() {
            Some((registrant, self.prefix_id))
        } else {
            None
        }
    }

    fn recurse(&self, uri_bits: &[&str], depth: usize) -> Option<(&DataWrapper<P>, ID)> {
        if let Some(edge) = self.edges.get(uri_bits[depth]) {
            if let Some(registrant) = edge.find_registrant(uri_bits, depth + 1) {
                return Some(registrant);
            }
        }
        if let Some(edge) = self.edges.get("") {
            if let Some(registrant) = edge.find_registrant(uri_bits, depth + 1) {
                return Some(registrant);
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::{PatternData, RegistrationPatternNode};
    use crate::messages::Reason;
    use crate::{MatchingPolicy, ID, URI};

    #[derive(Clone)]
    struct MockData {
        id: ID,
    }

    impl PatternData for MockData {
        fn get_id(&self) -> ID {
            self.id
        }
    }
    impl MockData {
        pub fn new(id: ID) -> MockData {
            MockData { id }
        }
    }

    #[test]
    fn adding_patterns() {
        let connection1 = MockData::new(1);
        let connection2 = MockData::new(2);
        let connection3 = MockData::new(3);
        let connection4 = MockData::new(4);
        let mut root = RegistrationPatternNode::new();

        let ids = [
            root.register_with(
                &URI::new("com.example.test..topic"),
                connection1,
                MatchingPolicy::Wildcard,
            )
            .unwrap(),
            root.register_with(
                &URI::new("com.example.test.specific.topic"),
                connection2,
                MatchingPolicy::Strict,
            )
            .unwrap(),
            root.register_with(
                &URI::new("com.example"),
                connection3,
                MatchingPolicy::Prefix,
            )
            .unwrap(),
            root.register_with(
                &URI::new("com.example.test"),
                connection4,
                MatchingPolicy::Prefix,
            )
            .unwrap(),
        ];
        println!("ids: {:?}", ids);

        assert_eq!(
            root.get_registrant_for(URI::new("com.example.test.specific.topic"))
                .unwrap()
                .1,
            ids[1]
        );
        assert_eq!(
            root.get_registrant_for(URI::new("com.example.test.another.topic"))
                .unwrap()
                .1,
            ids[0]
        );
        assert_eq!(
            root.get_registrant_for(URI::new("com.example.test.another"))
                .unwrap()
                .1,
            ids[3]
        );
        assert_eq!(
            root.get_registrant_for(URI::new("com.example")).unwrap().1,
            ids[2]
        );
    }

    #[test]
    fn removing_patterns() {
        let connection1 = MockData::new(1);
        let connection2 = MockData::new(2);
        let connection3 = MockData::new(3);
        let connection4 = MockData::new(4);
        let mut root = RegistrationPatternNode::new();

        let ids = [
            root.register_with(
                &URI::new("com.example.test..topic"),
                connection1.clone(),
                MatchingPolicy::Wildcard,
            )
            .unwrap(),
            root.register_with(
                &URI::new("com.example.test.specific.topic"),
                connection2,
                MatchingPolicy::Strict,
            )
            .unwrap(),
            root.register_with(
                &URI::new("com.example"),
                connection3,
                MatchingPolicy::Prefix,
            )
            .unwrap(),
            root.register_with(
                &URI::new("com.example.test"),
                connection4.clone(),
                MatchingPolicy::Prefix,
            )
            .unwrap(),
        ];

        root.unregister_with("com.example.test..topic", &connection1, false)
            .unwrap();
        root.unregister_with("com.example.test", &connection4, true)
            .unwrap();

        println!("ids: {:?}", ids);
        assert_eq!(
            root.get_registrant_for(URI::new("com.example.test.specific.topic"))
                .unwrap()
                .1,
            ids[1]
        );
    }

    #[test]
    fn duplicate_registration_on_same_pattern_is_rejected() {
        let connection1 = MockData::new(1);
        let connection2 = MockData::new(2);
        let mut root = RegistrationPatternNode::new();

        root.register_with(
            &URI::new("com.example.test"),
            connection1,
            MatchingPolicy::Strict,
        )
        .unwrap();

        let err = root
            .register_with(
                &URI::new("com.example.test"),
                connection2,
                MatchingPolicy::Strict,
            )
            .unwrap_err();
        assert_eq!(err.reason(), Reason::ProcedureAlreadyExists);
    }

    #[test]
    fn emptied_branches_are_pruned_from_the_trie() {
        let connection1 = MockData::new(1);
        let connection2 = MockData::new(2);
        let mut root = RegistrationPatternNode::new();

        root.register_with(
            &URI::new("com.example.test.add"),
            connection1.clone(),
            MatchingPolicy::Strict,
        )
        .unwrap();
        root.register_with(
            &URI::new("com.example.other.add"),
            connection2.clone(),
            MatchingPolicy::Strict,
        )
        .unwrap();
        assert_eq!(root.edge_count(), 1);

        root.unregister_with("com.example.test.add", &connection1, false)
            .unwrap();
        assert_eq!(root.edge_count(), 1);

        root.unregister_with("com.example.other.add", &connection2, false)
            .unwrap();
        assert_eq!(
            root.edge_count(),
            0,
            "trie should shrink back to the empty root once every registrant is gone"
        );
    }
}
