//! Code for handling IDs

/// Define a newtype for string IDs
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Deserialize,
            Debug,
            serde::Serialize,
        )]
        /// An ID type (e.g. `RegionID`, `LinkID`, etc.)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }
        }
    };
}
pub(crate) use define_id_type;

#[cfg(test)]
define_id_type!(GenericID);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        let id: GenericID = "DE-FR".into();
        assert_eq!(id.to_string(), "DE-FR");
        assert_eq!(id, GenericID::new("DE-FR"));
    }

    #[test]
    fn test_id_ordering() {
        let mut ids: Vec<GenericID> = vec!["NO".into(), "AT".into(), "DE".into()];
        ids.sort();
        assert_eq!(ids, vec!["AT".into(), "DE".into(), "NO".into()]);
    }
}
