use sha2::{Digest, Sha256};

/// Which pipeline step a cache entry fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Retrieval,
    Completion,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::Completion => "completion",
        }
    }
}

/// A structured cache key: operation kind plus the fields that determine the
/// cached value, hashed deterministically.
///
/// Fields are length-prefixed before hashing so that adjacent fields can
/// never be confused for one another (`("ab", "c")` and `("a", "bc")` hash
/// differently).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    kind: OperationKind,
    fields: Vec<String>,
}

impl CacheKey {
    pub fn retrieval(query: &str, top_k: usize) -> Self {
        Self {
            kind: OperationKind::Retrieval,
            fields: vec![query.to_string(), top_k.to_string()],
        }
    }

    pub fn completion(query: &str, context: &str) -> Self {
        Self {
            kind: OperationKind::Completion,
            fields: vec![query.to_string(), context.to_string()],
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The key under which the entry is stored, e.g. `rag:retrieval:ab12…`.
    pub fn storage_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        for field in &self.fields {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        format!("rag:{}:{}", self.kind.as_str(), hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_is_deterministic() {
        let a = CacheKey::retrieval("What is the PTO policy?", 3);
        let b = CacheKey::retrieval("What is the PTO policy?", 3);
        assert_eq!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn test_params_distinguish_keys() {
        let a = CacheKey::retrieval("What is the PTO policy?", 3);
        let b = CacheKey::retrieval("What is the PTO policy?", 5);
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn test_operation_kind_distinguishes_keys() {
        let a = CacheKey::retrieval("query", 5);
        let b = CacheKey::completion("query", "5");
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        // Naive concatenation would collide here.
        let a = CacheKey::completion("ab", "c");
        let b = CacheKey::completion("a", "bc");
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn test_storage_key_is_namespaced() {
        let key = CacheKey::completion("query", "context");
        assert!(key.storage_key().starts_with("rag:completion:"));
    }
}
