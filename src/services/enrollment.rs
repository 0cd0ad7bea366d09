//! Enrollment service
//!
//! Lifecycle of one user's place in an event. Stores apply the capacity ledger;
//! this layer decides who may ask for a change.

use std::sync::Arc;
use crate::database::{EnrollmentStore, EventStore};
use crate::middleware::auth::{require, Action, Resource};
use crate::models::{
    Actor, CreateEnrollmentRequest, Enrollment, EnrollmentStatus, UpdateEnrollmentRequest,
};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_enrollment_transition;

#[derive(Clone)]
pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentStore>,
    events: Arc<dyn EventStore>,
}

impl EnrollmentService {
    pub fn new(enrollments: Arc<dyn EnrollmentStore>, events: Arc<dyn EventStore>) -> Self {
        Self { enrollments, events }
    }

    async fn load(&self, id: i64) -> Result<Enrollment> {
        self.enrollments
            .find_enrollment(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("enrollment", id))
    }

    /// Enroll a user; enrolling directly as confirmed takes a slot
    pub async fn enroll(&self, actor: &Actor, request: CreateEnrollmentRequest) -> Result<Enrollment> {
        require(actor, Action::Create, Resource::Enrollment { owner_id: request.user_id })?;
        if self.events.find_event(request.event_id).await?.is_none() {
            return Err(SportsHubError::not_found("event", request.event_id));
        }

        let enrollment = self.enrollments.create_enrollment(request).await?;
        log_enrollment_transition(enrollment.id, enrollment.event_id, None, Some(enrollment.status));
        Ok(enrollment)
    }

    pub async fn update(&self, actor: &Actor, id: i64, request: UpdateEnrollmentRequest) -> Result<Enrollment> {
        let current = self.load(id).await?;
        require(actor, Action::Update, Resource::Enrollment { owner_id: current.user_id })?;

        let updated = self.enrollments.update_enrollment(id, request).await?;
        if updated.status != current.status {
            log_enrollment_transition(id, updated.event_id, Some(current.status), Some(updated.status));
        }
        Ok(updated)
    }

    pub async fn set_status(&self, actor: &Actor, id: i64, status: EnrollmentStatus) -> Result<Enrollment> {
        self.update(actor, id, UpdateEnrollmentRequest::status(status)).await
    }

    /// Remove an enrollment, returning a confirmed one's slot to the event
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<()> {
        let current = self.load(id).await?;
        require(actor, Action::Delete, Resource::Enrollment { owner_id: current.user_id })?;

        let deleted = self.enrollments.delete_enrollment(id).await?;
        log_enrollment_transition(id, deleted.event_id, Some(deleted.status), None);
        Ok(())
    }

    pub async fn get(&self, actor: &Actor, id: i64) -> Result<Enrollment> {
        let enrollment = self.load(id).await?;
        require(actor, Action::Read, Resource::Enrollment { owner_id: enrollment.user_id })?;
        Ok(enrollment)
    }

    pub async fn list_for_user(&self, actor: &Actor, user_id: i64) -> Result<Vec<Enrollment>> {
        require(actor, Action::Read, Resource::Enrollment { owner_id: user_id })?;
        self.enrollments.list_user_enrollments(user_id).await
    }

    pub async fn list_for_event(&self, actor: &Actor, event_id: i64) -> Result<Vec<Enrollment>> {
        require(actor, Action::Read, Resource::AllEnrollments)?;
        self.enrollments.list_event_enrollments(event_id).await
    }
}
