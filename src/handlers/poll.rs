use super::extract::{ApiJson, ApiQuery};
use super::{AppState, load_poll, poll_from_object, poll_to_object};
use crate::credentials::{Credentials, Session};
use crate::db::{AnalyticEvent, LockId, LockOptions, LockTag, UpdateOptions};
use crate::error::AppError;
use crate::models::{PollResponse, SuccessResponse, UpdatePollRequest};
use crate::voting::reconcile::{apply_crucial_update, apply_non_crucial_update, reset};
use axum::{Json, extract::State};
use chrono::Utc;
use log::info;
use std::sync::Arc;

pub async fn get_poll(
    State(state): State<Arc<AppState>>,
    ApiQuery(credentials): ApiQuery<Credentials>,
) -> Result<Json<PollResponse>, AppError> {
    let session = credentials.resolve(state.config.interactive_key.as_deref())?;
    let poll = load_poll(&state, &session).await?;

    Ok(Json(PollResponse { poll, success: true }))
}

fn poll_update_lock(state: &AppState, session: &Session) -> LockOptions {
    LockOptions {
        lock_id: LockId::bucketed(
            &session.asset_id,
            LockTag::PollUpdate,
            Utc::now(),
            state.config.vote_lock_window,
        ),
        release_lock: true,
    }
}

pub async fn update_poll(
    State(state): State<Arc<AppState>>,
    ApiQuery(credentials): ApiQuery<Credentials>,
    ApiJson(body): ApiJson<UpdatePollRequest>,
) -> Result<Json<PollResponse>, AppError> {
    let session = credentials.resolve(state.config.interactive_key.as_deref())?;
    let context = "Error updating poll settings";

    let stored = if body.crucial {
        // Validate before touching the store
        let next = apply_crucial_update(
            body.question.as_deref().unwrap_or_default(),
            body.answers.as_deref().unwrap_or_default(),
            body.display_mode,
        )?;
        info!(
            "Replacing poll on asset {} with {} answers, results cleared",
            session.asset_id,
            next.answers.len()
        );

        let options = UpdateOptions {
            lock: Some(poll_update_lock(&state, &session)),
            analytics: vec![AnalyticEvent {
                analytic_name: "pollUpdate".to_string(),
                profile_id: Some(session.profile_id.clone()),
                url_slug: session.url_slug.clone(),
                unique_key: Some(session.profile_id.clone()),
            }],
        };
        let patch = poll_to_object(&next).map_err(AppError::store(context))?;
        state.database.update_data_object(&session.asset_id, patch, options).await
    } else {
        load_poll(&state, &session).await?;
        info!("Setting display mode {:?} on asset {}", body.display_mode, session.asset_id);

        let options = UpdateOptions {
            lock: Some(poll_update_lock(&state, &session)),
            analytics: Vec::new(),
        };
        state
            .database
            .modify_data_object(&session.asset_id, options, |mut data| {
                let current = poll_from_object(data.clone())?;
                let next = apply_non_crucial_update(&current, body.display_mode);

                // Only the display mode is written so concurrent votes survive
                data.insert("displayMode".to_string(), serde_json::to_value(next.display_mode)?);
                Ok(data)
            })
            .await
    };

    let stored = stored.map_err(AppError::store(context))?;
    let poll = poll_from_object(stored).map_err(AppError::store(context))?;

    Ok(Json(PollResponse { poll, success: true }))
}

pub async fn reset_poll(
    State(state): State<Arc<AppState>>,
    ApiQuery(credentials): ApiQuery<Credentials>,
) -> Result<Json<SuccessResponse>, AppError> {
    let session = credentials.resolve(state.config.interactive_key.as_deref())?;
    let context = "Error resetting asset";

    let default = poll_to_object(&reset()).map_err(AppError::store(context))?;
    state
        .database
        .replace_data_object(&session.asset_id, default)
        .await
        .map_err(AppError::store(context))?;

    info!("Reset poll on asset {} (requested by {})", session.asset_id, session.profile_id);
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handlers::test_support::{credentials, state, state_with};
    use crate::handlers::vote::vote;
    use crate::models::{DisplayMode, Poll, VoteRequest};
    use crate::voting::PollError;
    use axum::http::StatusCode;

    fn crucial(question: &str, answers: &[&str]) -> UpdatePollRequest {
        UpdatePollRequest {
            question: Some(question.to_string()),
            answers: Some(answers.iter().map(|a| a.to_string()).collect()),
            display_mode: DisplayMode::Percentage,
            crucial: true,
        }
    }

    async fn cast(state: &Arc<AppState>, profile: &str, option: usize) -> Poll {
        let Json(response) = vote(
            State(state.clone()),
            ApiQuery(credentials("asset1", profile)),
            ApiJson(VoteRequest {
                option_id: Some(option),
                profile_id: Some(profile.to_string()),
            }),
        )
        .await
        .unwrap();
        response.poll
    }

    #[tokio::test]
    async fn get_poll_on_fresh_asset_returns_default() {
        let state = state().await;
        let Json(response) = get_poll(State(state), ApiQuery(credentials("asset1", "p1")))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.poll, Poll::default());
    }

    #[tokio::test]
    async fn get_poll_without_asset_id_is_unauthorized() {
        let state = state().await;
        let mut creds = credentials("asset1", "p1");
        creds.asset_id = None;

        let err = get_poll(State(state), ApiQuery(creds)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn crucial_update_stores_filtered_answers() {
        let state = state().await;
        let Json(response) = update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(crucial("Best color?", &["Red", "Blue", "", "", ""])),
        )
        .await
        .unwrap();

        assert_eq!(response.poll.question, "Best color?");
        assert_eq!(response.poll.answers, vec!["Red".to_string(), "Blue".to_string()]);
        assert_eq!(response.poll.options.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(response.poll.total_votes(), 0);
        assert_eq!(state.database.count_analytics("asset1", "pollUpdate").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_without_writing() {
        let state = state().await;
        let err = update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(crucial("", &["Red", "Blue"])),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(PollError::QuestionRequired)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(state.database.fetch_data_object("asset1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn crucial_update_clears_existing_votes() {
        let state = state().await;
        let creds = || ApiQuery(credentials("asset1", "admin"));
        update_poll(State(state.clone()), creds(), ApiJson(crucial("Q1", &["a", "b"])))
            .await
            .unwrap();
        cast(&state, "p1", 1).await;

        let Json(response) = update_poll(State(state.clone()), creds(), ApiJson(crucial("Q2", &["c", "d", "e"])))
            .await
            .unwrap();
        assert!(response.poll.results.is_empty());
        assert_eq!(response.poll.options.len(), 3);
        assert_eq!(response.poll.total_votes(), 0);
    }

    #[tokio::test]
    async fn non_crucial_update_only_changes_display_mode() {
        let state = state().await;
        update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(crucial("Q", &["a", "b"])),
        )
        .await
        .unwrap();
        cast(&state, "p1", 0).await;

        let Json(response) = update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(UpdatePollRequest {
                display_mode: DisplayMode::Count,
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.poll.display_mode, DisplayMode::Count);
        assert_eq!(response.poll.question, "Q");
        assert_eq!(response.poll.votes_for(0), 1);
        assert_eq!(response.poll.answer_of("p1"), Some(0));
        // Only the crucial save is counted
        assert_eq!(state.database.count_analytics("asset1", "pollUpdate").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_restores_default_poll() {
        let state = state().await;
        update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(crucial("Q", &["a", "b"])),
        )
        .await
        .unwrap();
        cast(&state, "p1", 1).await;

        let Json(response) = reset_poll(State(state.clone()), ApiQuery(credentials("asset1", "admin")))
            .await
            .unwrap();
        assert!(response.success);

        let Json(fetched) = get_poll(State(state), ApiQuery(credentials("asset1", "p1")))
            .await
            .unwrap();
        assert!(fetched.poll.results.is_empty());
        assert_eq!(fetched.poll.display_mode, DisplayMode::Percentage);
    }

    #[tokio::test]
    async fn wrong_interactive_key_is_rejected() {
        let state = state_with(Config {
            interactive_key: Some("secret".to_string()),
            ..Config::default()
        })
        .await;

        let err = reset_poll(State(state), ApiQuery(credentials("asset1", "admin")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn held_update_lock_is_a_conflict() {
        let window = chrono::Duration::days(36_500);
        let state = state_with(Config {
            vote_lock_window: window,
            ..Config::default()
        })
        .await;
        update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(crucial("Q", &["a", "b"])),
        )
        .await
        .unwrap();

        // Another save in the same bucket that has not finished yet
        let held = UpdateOptions {
            lock: Some(LockOptions {
                lock_id: LockId::bucketed("asset1", LockTag::PollUpdate, Utc::now(), window),
                release_lock: false,
            }),
            analytics: Vec::new(),
        };
        state
            .database
            .update_data_object("asset1", crate::db::DataObject::new(), held)
            .await
            .unwrap();

        let err = update_poll(
            State(state.clone()),
            ApiQuery(credentials("asset1", "admin")),
            ApiJson(UpdatePollRequest {
                display_mode: DisplayMode::Count,
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let Json(fetched) = get_poll(State(state), ApiQuery(credentials("asset1", "p1")))
            .await
            .unwrap();
        assert_eq!(fetched.poll.display_mode, DisplayMode::Percentage);
    }
}
