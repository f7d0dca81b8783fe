//! Index declarations, created once at startup

/// Secondary index over one or more top-level document fields
///
/// Documents missing any of the indexed fields are not constrained by a
/// unique index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    /// Declare a unique index over `fields`
    pub fn unique(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: true,
        }
    }

    /// Declare a lookup index over `fields`
    pub fn lookup(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
        }
    }

    /// Physical index name within `collection`
    ///
    /// The name encodes the covered fields so that a binding can recover them
    /// from a constraint name reported by the database.
    pub fn name(&self, collection: &str) -> String {
        let prefix = if self.unique { "ux" } else { "ix" };
        format!("{}_{}__{}", prefix, collection, self.fields.join("__"))
    }
}

/// Recover the indexed fields from a physical index name
pub fn fields_from_index_name(collection: &str, index: &str) -> Vec<String> {
    if index == format!("{}_pkey", collection) {
        return vec!["id".to_string()];
    }

    ["ux", "ix"]
        .iter()
        .find_map(|prefix| index.strip_prefix(&format!("{}_{}__", prefix, collection)))
        .map(|rest| rest.split("__").map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_round_trip() {
        let index = IndexSpec::unique(&["ownerId", "slug"]);
        let name = index.name("boards");

        assert_eq!(name, "ux_boards__ownerId__slug");
        assert_eq!(fields_from_index_name("boards", &name), index.fields);
    }

    #[test]
    fn test_primary_key_maps_to_id() {
        assert_eq!(fields_from_index_name("users", "users_pkey"), vec!["id"]);
    }

    #[test]
    fn test_unknown_index_has_no_fields() {
        assert!(fields_from_index_name("users", "something_else").is_empty());
    }
}
