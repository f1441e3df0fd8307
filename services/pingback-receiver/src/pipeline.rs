// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pingback verification pipeline.
//!
//! validate payload -> examine source -> resolve target -> duplicate check
//! -> decide -> persist. Every step's failure is terminal and maps to a
//! [`PingbackResponse`].

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::examiner::SourceExaminer;
use crate::models::{PingRequest, PingbackHistory, ResolvedTarget};
use crate::payload::validate_payload;
use crate::slug::{resolve_target, Resolution};
use crate::store::{ContentResolver, HistoryStore};

/// Outcome of processing a received pingback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingbackResponse {
    Success,
    InvalidPingRequest,
    Error17SourceNotContainTargetUri,
    Error32TargetUriNotExist,
    Error48PingbackAlreadyRegistered,
    SpamDetectedFakeNotFound,
    GenericError,
}

impl PingbackResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InvalidPingRequest => "InvalidPingRequest",
            Self::Error17SourceNotContainTargetUri => "Error17SourceNotContainTargetUri",
            Self::Error32TargetUriNotExist => "Error32TargetUriNotExist",
            Self::Error48PingbackAlreadyRegistered => "Error48PingbackAlreadyRegistered",
            Self::SpamDetectedFakeNotFound => "SpamDetectedFakeNotFound",
            Self::GenericError => "GenericError",
        }
    }
}

impl std::fmt::Display for PingbackResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processes received pingbacks against local content and history.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct PingbackService {
    content: Arc<dyn ContentResolver>,
    history: Arc<dyn HistoryStore>,
    examiner: SourceExaminer,
}

impl PingbackService {
    pub fn new(
        content: Arc<dyn ContentResolver>,
        history: Arc<dyn HistoryStore>,
        examiner: SourceExaminer,
    ) -> Self {
        Self {
            content,
            history,
            examiner,
        }
    }

    /// History store backing this service, for administrative access.
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Process a raw pingback request body submitted from `requester_address`.
    ///
    /// `on_accepted` runs once, with the persisted record, only on success.
    pub async fn process_received_payload<F>(
        &self,
        raw_body: &str,
        requester_address: &str,
        on_accepted: F,
    ) -> PingbackResponse
    where
        F: FnOnce(&PingbackHistory) + Send,
    {
        match self.process(raw_body, requester_address, on_accepted).await {
            Ok(response) => response,
            Err(e) => {
                error!(requester = %requester_address, error = %e, "Pingback processing failed");
                PingbackResponse::GenericError
            }
        }
    }

    async fn process<F>(
        &self,
        raw_body: &str,
        requester_address: &str,
        on_accepted: F,
    ) -> Result<PingbackResponse>
    where
        F: FnOnce(&PingbackHistory) + Send,
    {
        let claim = match validate_payload(raw_body) {
            Ok(claim) => claim,
            Err(e) => {
                info!(requester = %requester_address, error = %e, "Invalid pingback request");
                return Ok(PingbackResponse::InvalidPingRequest);
            }
        };

        let source_document = self
            .examiner
            .examine(&claim.source_url, &claim.target_url)
            .await;
        let request = PingRequest {
            source_url: claim.source_url,
            target_url: claim.target_url,
            source_document,
        };

        let target = match resolve_target(self.content.as_ref(), &request.target_url).await? {
            Resolution::Found(target) => target,
            Resolution::NotFound | Resolution::Unparseable(_) => {
                info!(target = %request.target_url, "Pingback target does not exist");
                return Ok(PingbackResponse::Error32TargetUriNotExist);
            }
        };

        if self
            .history
            .exists(target.id, &request.source_url, requester_address)
            .await?
        {
            info!(
                source = %request.source_url,
                target = %request.target_url,
                requester = %requester_address,
                "Pingback already registered"
            );
            return Ok(PingbackResponse::Error48PingbackAlreadyRegistered);
        }

        let document = &request.source_document;
        if !document.source_has_link {
            info!(
                source = %request.source_url,
                target = %request.target_url,
                "Source does not link to target"
            );
            return Ok(PingbackResponse::Error17SourceNotContainTargetUri);
        }
        if document.contains_html {
            warn!(
                source = %request.source_url,
                title = %document.title,
                requester = %requester_address,
                "Markup in source title, treating pingback as spam"
            );
            return Ok(PingbackResponse::SpamDetectedFakeNotFound);
        }

        self.accept(&request, &target, requester_address, on_accepted)
            .await
    }

    async fn accept<F>(
        &self,
        request: &PingRequest,
        target: &ResolvedTarget,
        requester_address: &str,
        on_accepted: F,
    ) -> Result<PingbackResponse>
    where
        F: FnOnce(&PingbackHistory) + Send,
    {
        let record = PingbackHistory::new(request, target, requester_address);

        match self.history.save(&record).await {
            Ok(()) => {}
            Err(AppError::DuplicatePingback { .. }) => {
                debug!(source = %request.source_url, "Lost race against identical pingback");
                return Ok(PingbackResponse::Error48PingbackAlreadyRegistered);
            }
            Err(e) => return Err(e),
        }

        info!(
            id = %record.id,
            domain = %record.domain,
            source = %record.source_url,
            target_post_id = %record.target_post_id,
            requester = %requester_address,
            "Pingback accepted"
        );
        on_accepted(&record);

        Ok(PingbackResponse::Success)
    }
}
