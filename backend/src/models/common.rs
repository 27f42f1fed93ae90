use serde::{Deserialize, Deserializer};

/// Presence-aware wrapper for partial-update fields.
///
/// Use with `#[serde(default)]` so a missing key deserializes as `Absent`:
/// - key missing   -> `Absent`
/// - `null`        -> `Null`
/// - value         -> `Value(v)`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Field<T> {
    /// The supplied value, if the caller sent a non-null one.
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Absent | Field::Null => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

impl<'de, T> Deserialize<'de> for Field<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default)]
        name: Field<String>,
    }

    #[test]
    fn distinguishes_missing_null_and_value() {
        let p: Patch = serde_json::from_str("{}").unwrap();
        assert!(p.name.is_absent());

        let p: Patch = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(p.name, Field::Null);
        assert_eq!(p.name.value(), None);

        let p: Patch = serde_json::from_str(r#"{"name": "Acme"}"#).unwrap();
        assert_eq!(p.name.value().map(String::as_str), Some("Acme"));
    }
}
