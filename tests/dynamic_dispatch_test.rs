use regflow::domain::ports::{RegistrationRepositoryRef, VisitorRepositoryRef};
use regflow::domain::registration::Registration;
use regflow::domain::visitor::{Visitor, VisitorProfile};
use regflow::infrastructure::in_memory::{
    InMemoryRegistrationRepository, InMemoryVisitorRepository,
};
use std::sync::Arc;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let registrations: RegistrationRepositoryRef = Arc::new(InMemoryRegistrationRepository::new());
    let visitors: VisitorRepositoryRef = Arc::new(InMemoryVisitorRepository::new());

    let registration = Registration::new("s1");
    let visitor = Visitor::from_profile("s1", &VisitorProfile::default());

    // Verify Send + Sync by spawning tasks
    let reg_handle = tokio::spawn(async move {
        registrations.insert(registration).await.unwrap();
        registrations.find("s1").await.unwrap().unwrap()
    });

    let visitor_handle = tokio::spawn(async move {
        visitors.insert(visitor).await.unwrap();
        visitors.find("s1").await.unwrap().unwrap()
    });

    let retrieved_registration = reg_handle.await.unwrap();
    assert_eq!(retrieved_registration.session_id, "s1");

    let retrieved_visitor = visitor_handle.await.unwrap();
    assert_eq!(retrieved_visitor.session_id, "s1");
}
