use super::extract::{ApiJson, ApiQuery};
use super::{AppState, load_poll, poll_from_object};
use crate::credentials::Credentials;
use crate::db::{AnalyticEvent, LockId, LockOptions, LockTag, UpdateOptions};
use crate::error::AppError;
use crate::models::{PollResponse, VoteRequest};
use crate::voting::{PollError, reconcile::apply_vote};
use axum::{Json, extract::State};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;

pub async fn vote(
    State(state): State<Arc<AppState>>,
    ApiQuery(credentials): ApiQuery<Credentials>,
    ApiJson(body): ApiJson<VoteRequest>,
) -> Result<Json<PollResponse>, AppError> {
    let session = credentials.resolve(state.config.interactive_key.as_deref())?;
    let context = "Error recording vote";

    let profile_id = body
        .profile_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let (option_id, profile_id) = match (body.option_id, profile_id) {
        (Some(option_id), Some(profile_id)) => (option_id, profile_id.to_string()),
        _ => return Err(PollError::MissingVoteFields.into()),
    };

    if profile_id != session.profile_id {
        warn!(
            "Vote body profile {} differs from session profile {} on asset {}",
            profile_id, session.profile_id, session.asset_id
        );
    }

    info!("Recording vote: asset={}, option={}, profile={}", session.asset_id, option_id, profile_id);

    // Make sure the document exists before reconciling against it
    load_poll(&state, &session).await?;

    let options = UpdateOptions {
        lock: Some(LockOptions {
            lock_id: LockId::bucketed(
                &session.asset_id,
                LockTag::VoteUpdate,
                Utc::now(),
                state.config.vote_lock_window,
            ),
            release_lock: true,
        }),
        analytics: vec![AnalyticEvent {
            analytic_name: "completions".to_string(),
            profile_id: Some(profile_id.clone()),
            url_slug: session.url_slug.clone(),
            unique_key: Some(profile_id.clone()),
        }],
    };

    let stored = state
        .database
        .modify_data_object(&session.asset_id, options, |mut data| {
            let current = poll_from_object(data.clone())?;
            let next = apply_vote(&current, option_id, &profile_id)?;

            // Options and results only; question, answers and display mode are left alone
            data.insert("options".to_string(), serde_json::to_value(&next.options)?);
            data.insert("results".to_string(), serde_json::to_value(&next.results)?);
            Ok(data)
        })
        .await
        .map_err(AppError::store(context))?;
    let poll = poll_from_object(stored).map_err(AppError::store(context))?;

    Ok(Json(PollResponse { poll, success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::DataObject;
    use crate::handlers::test_support::{credentials, state, state_with};
    use crate::models::{DisplayMode, Poll};
    use crate::voting::reconcile::apply_crucial_update;
    use axum::http::StatusCode;
    use chrono::Duration;

    async fn seeded_state() -> Arc<AppState> {
        seed(state().await).await
    }

    async fn seed(state: Arc<AppState>) -> Arc<AppState> {
        let poll = apply_crucial_update(
            "Best color?",
            &["Red".to_string(), "Blue".to_string()],
            DisplayMode::Count,
        )
        .unwrap();
        state
            .database
            .replace_data_object("asset1", crate::handlers::poll_to_object(&poll).unwrap())
            .await
            .unwrap();
        state
    }

    async fn cast(state: &Arc<AppState>, profile: &str, option: usize) -> Result<Poll, AppError> {
        let Json(response) = vote(
            State(state.clone()),
            ApiQuery(credentials("asset1", profile)),
            ApiJson(VoteRequest {
                option_id: Some(option),
                profile_id: Some(profile.to_string()),
            }),
        )
        .await?;
        Ok(response.poll)
    }

    #[tokio::test]
    async fn revote_moves_the_vote() {
        let state = seeded_state().await;
        cast(&state, "p1", 0).await.unwrap();
        let poll = cast(&state, "p1", 1).await.unwrap();

        assert_eq!(poll.votes_for(0), 0);
        assert_eq!(poll.votes_for(1), 1);
        assert_eq!(poll.answer_of("p1"), Some(1));
    }

    #[tokio::test]
    async fn two_profiles_same_option() {
        let state = seeded_state().await;
        cast(&state, "p1", 1).await.unwrap();
        let poll = cast(&state, "p2", 1).await.unwrap();

        assert_eq!(poll.votes_for(1), 2);
        assert_eq!(poll.results.len(), 2);
        assert_eq!(state.database.count_analytics("asset1", "completions").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn vote_keeps_question_and_display_mode() {
        let state = seeded_state().await;
        let poll = cast(&state, "p1", 0).await.unwrap();

        assert_eq!(poll.question, "Best color?");
        assert_eq!(poll.display_mode, DisplayMode::Count);
    }

    #[tokio::test]
    async fn out_of_range_option_is_rejected() {
        let state = seeded_state().await;
        let err = cast(&state, "p1", 2).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(PollError::InvalidOption)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let stored = state.database.fetch_data_object("asset1").await.unwrap().unwrap();
        let poll = poll_from_object(stored).unwrap();
        assert_eq!(poll.total_votes(), 0);
        assert!(poll.results.is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let state = seeded_state().await;
        let err = vote(
            State(state),
            ApiQuery(credentials("asset1", "p1")),
            ApiJson(VoteRequest {
                option_id: Some(0),
                profile_id: Some("   ".to_string()),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(PollError::MissingVoteFields)));
        assert_eq!(err.to_string(), "optionId and profileId are required");
    }

    #[tokio::test]
    async fn vote_on_unconfigured_poll_is_rejected() {
        let state = state().await;
        let err = cast(&state, "p1", 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(PollError::InvalidOption)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_are_all_counted() {
        let state = seeded_state().await;

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move { cast(&state, &format!("p{}", i), i % 2).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = state.database.fetch_data_object("asset1").await.unwrap().unwrap();
        let poll = poll_from_object(stored).unwrap();
        assert_eq!(poll.total_votes(), 20);
        assert_eq!(poll.results.len(), 20);
        assert_eq!(poll.votes_for(0), 10);
        assert_eq!(poll.votes_for(1), 10);
        assert_eq!(state.database.count_analytics("asset1", "completions").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn held_vote_lock_is_a_conflict_and_writes_nothing() {
        // One bucket spans a century, so the test cannot straddle a boundary
        let window = Duration::days(36_500);
        let state = seed(
            state_with(Config {
                vote_lock_window: window,
                ..Config::default()
            })
            .await,
        )
        .await;

        let held = LockOptions {
            lock_id: LockId::bucketed("asset1", LockTag::VoteUpdate, Utc::now(), window),
            release_lock: false,
        };
        state
            .database
            .update_data_object(
                "asset1",
                DataObject::new(),
                UpdateOptions {
                    lock: Some(held),
                    analytics: Vec::new(),
                },
            )
            .await
            .unwrap();

        let err = cast(&state, "p1", 0).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let stored = state.database.fetch_data_object("asset1").await.unwrap().unwrap();
        let poll = poll_from_object(stored).unwrap();
        assert_eq!(poll.total_votes(), 0);
        assert!(poll.results.is_empty());
        assert_eq!(state.database.count_analytics("asset1", "completions").await.unwrap(), 0);
    }
}
