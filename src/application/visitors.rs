use crate::domain::ports::VisitorRepositoryRef;
use crate::domain::visitor::{Visitor, VisitorProfile};
use crate::error::Result;

/// Finds or creates the visitor record linked 1:1 to a session.
///
/// `ensure` is idempotent: an existing visitor is returned unchanged, no
/// matter what profile the current request carries. Visitors are created
/// exactly once and never updated.
pub struct VisitorProfileResolver {
    visitors: VisitorRepositoryRef,
}

impl VisitorProfileResolver {
    pub fn new(visitors: VisitorRepositoryRef) -> Self {
        Self { visitors }
    }

    pub async fn ensure(&self, session_id: &str, profile: &VisitorProfile) -> Result<Visitor> {
        if let Some(existing) = self.visitors.find(session_id).await? {
            return Ok(existing);
        }

        let visitor = Visitor::from_profile(session_id, profile);
        self.visitors.insert(visitor.clone()).await?;
        tracing::debug!(session_id, "visitor created");
        Ok(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryVisitorRepository;
    use std::sync::Arc;

    fn profile(city: &str) -> VisitorProfile {
        VisitorProfile {
            city: Some(city.to_string()),
            ..VisitorProfile::default()
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_once() {
        let resolver = VisitorProfileResolver::new(Arc::new(InMemoryVisitorRepository::new()));

        let first = resolver.ensure("s1", &profile("Riga")).await.unwrap();
        assert_eq!(first.city.as_deref(), Some("Riga"));

        // A later request with a different profile does not touch the record.
        let second = resolver.ensure("s1", &profile("Oslo")).await.unwrap();
        assert_eq!(second.city.as_deref(), Some("Riga"));
        assert_eq!(second.created_at, first.created_at);
    }
}
