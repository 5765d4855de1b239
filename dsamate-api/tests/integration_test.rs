/// Integration tests for the DSAMate API
///
/// Tests that need Postgres read `DATABASE_URL` and return early when it is
/// unset. The offline tests run against a pool that never connects.

mod common;

use axum::http::StatusCode;
use common::{unique_email, TestContext, TEST_PASSWORD};
use dsamate_shared::auth::oauth::{OAuthProfile, OAuthProvider};
use dsamate_shared::catalog::roadmaps::RoadmapCatalog;
use dsamate_shared::models::user::User;
use serde_json::json;
use uuid::Uuid;

// ---- offline -------------------------------------------------------------

#[tokio::test]
async fn test_questions_single_topic_and_unknown_topic() {
    let ctx = TestContext::offline();

    let response = ctx
        .send("GET", "/api/questions?topicId=1&difficulty=easy", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["id"], 1);
    for question in response.body["data"]["questions"].as_array().unwrap() {
        assert_eq!(question["difficulty"], "easy");
    }

    let missing = ctx.send("GET", "/api/questions?topicId=999", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["success"], false);
}

#[tokio::test]
async fn test_all_questions() {
    let ctx = TestContext::offline();

    let response = ctx.send("GET", "/api/questions", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 19);
}

#[tokio::test]
async fn test_roadmap_catalog_endpoints() {
    let ctx = TestContext::offline();

    let list = ctx.send("GET", "/api/roadmaps", None, None).await;
    assert_eq!(list.status, StatusCode::OK);
    let ids: Vec<&str> = list.body["roadmaps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"dsa-fundamentals"));
    assert!(ids.contains(&"interview-prep"));

    let one = ctx.send("GET", "/api/roadmaps/interview-prep", None, None).await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.body["roadmap"]["id"], "interview-prep");

    let missing = ctx.send("GET", "/api/roadmaps/nope", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_potd_is_a_catalog_question() {
    let ctx = TestContext::offline();

    let response = ctx.send("GET", "/api/potd", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["problem"]["title"].is_string());
    assert!(response.body["problem"]["difficulty"].is_string());
}

#[tokio::test]
async fn test_potd_send_requires_cron_secret() {
    let ctx = TestContext::offline();

    let missing = ctx.send("POST", "/api/potd/send", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = ctx
        .send_with_headers("POST", "/api/potd/send", None, None, &[("x-cron-secret", "nope")])
        .await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_routes_reject_anonymous_requests() {
    let ctx = TestContext::offline();

    for (method, uri) in [
        ("GET", "/api/auth/check-auth"),
        ("POST", "/api/progress/update"),
        ("POST", "/api/badges"),
        ("GET", "/api/roadmaps/dsa-fundamentals/progress"),
        ("POST", "/api/quiz-results"),
        ("DELETE", "/api/avatar"),
    ] {
        let response = ctx.send(method, uri, Some(json!({})), None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_security_headers_present() {
    let ctx = TestContext::offline();

    let response = ctx.send("GET", "/api/roadmaps", None, None).await;
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_email_preference_validation() {
    let ctx = TestContext::offline();

    let missing = ctx.send("GET", "/api/email-preference?email=a@b.co", None, None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Missing email or action.");

    let invalid = ctx
        .send("GET", "/api/email-preference?email=a@b.co&action=spam", None, None)
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["message"], "Invalid action.");
}

#[tokio::test]
async fn test_sign_up_validation_happens_before_database() {
    let ctx = TestContext::offline();

    let missing = ctx
        .send("POST", "/api/auth/sign-up", Some(json!({ "email": "a@b.co" })), None)
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "All fields are required.");

    let mismatch = ctx
        .send(
            "POST",
            "/api/auth/sign-up",
            Some(json!({
                "fullName": "Ada",
                "email": "a@b.co",
                "password": TEST_PASSWORD,
                "confirmPassword": "something-else"
            })),
            None,
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch.body["message"], "Passwords do not match.");
}

#[tokio::test]
async fn test_sign_up_rate_limited() {
    let ctx = TestContext::offline();
    let body = json!({ "email": "a@b.co" });

    for _ in 0..ctx.config.rate_limit.max_requests {
        let response = ctx.send("POST", "/api/auth/sign-up", Some(body.clone()), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.headers.get("ratelimit-remaining").is_some());
    }

    let limited = ctx.send("POST", "/api/auth/sign-up", Some(body), None).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers.get("retry-after").is_some());
    assert_eq!(
        limited.body["message"],
        "Too many requests, please try again later."
    );
}

// ---- database ------------------------------------------------------------

#[tokio::test]
async fn test_sign_up_verify_and_check_auth() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;

    let me = ctx
        .send("GET", "/api/auth/check-auth", None, Some(&user.cookie))
        .await;
    assert_eq!(me.body["loggedIn"], true);
    assert_eq!(me.body["user"]["email"], user.email.as_str());

    let sign_in = ctx
        .send(
            "POST",
            "/api/auth/sign-in",
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(sign_in.status, StatusCode::OK);
    assert_eq!(sign_in.body["message"], "Signin successful. OTP sent to email.");

    let logout = ctx.send("POST", "/api/auth/logout", None, Some(&user.cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.session_cookie().as_deref(), Some("session="));

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;

    let again = ctx.sign_up(&user.email.to_uppercase()).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["message"], "Email is already registered.");

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_password_sign_in_rejected_for_oauth_account() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let email = unique_email();
    let profile = OAuthProfile {
        email: email.clone(),
        name: Some("Octo Cat".to_string()),
        avatar: None,
    };
    let user = User::find_or_create_oauth(&ctx.db, &profile, OAuthProvider::Github)
        .await
        .unwrap();
    assert!(user.password_hash.is_none());

    let response = ctx
        .send(
            "POST",
            "/api/auth/sign-in",
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "Invalid credentials.");

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_wrong_otp_is_unauthorized() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let email = unique_email();
    assert_eq!(ctx.sign_up(&email).await.status, StatusCode::OK);

    let real = ctx.last_otp(&email);
    let wrong = if real == "000000" { "111111" } else { "000000" };

    let response = ctx
        .send(
            "POST",
            "/api/auth/verify-otp",
            Some(json!({ "email": email, "otp": wrong })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    sqlx::query("DELETE FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_otp_is_gone() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let email = unique_email();
    assert_eq!(ctx.sign_up(&email).await.status, StatusCode::OK);
    let otp = ctx.last_otp(&email);

    sqlx::query(
        "UPDATE users SET otp_expires_at = NOW() - INTERVAL '1 minute' WHERE LOWER(email) = LOWER($1)",
    )
    .bind(&email)
    .execute(&ctx.db)
    .await
    .unwrap();

    let response = ctx
        .send(
            "POST",
            "/api/auth/verify-otp",
            Some(json!({ "email": email, "otp": otp })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::GONE);

    sqlx::query("DELETE FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_password_reset_flow() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;

    let forgot = ctx
        .send(
            "POST",
            "/api/auth/forgot-password",
            Some(json!({ "email": user.email })),
            None,
        )
        .await;
    assert_eq!(forgot.status, StatusCode::OK);

    let otp = ctx.last_otp(&user.email);
    let verified = ctx
        .send(
            "POST",
            "/api/auth/verify-forgot-password-otp",
            Some(json!({ "email": user.email, "otp": otp })),
            None,
        )
        .await;
    assert_eq!(verified.status, StatusCode::OK, "{}", verified.body);
    let token = verified.body["resetToken"].as_str().unwrap().to_string();

    let changed = ctx
        .send(
            "POST",
            "/api/auth/change-password",
            Some(json!({
                "email": user.email,
                "password": "a-brand-new-password",
                "resetToken": token
            })),
            None,
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{}", changed.body);
    assert_eq!(changed.body["message"], "Password Updated.");

    let old_password = ctx
        .send(
            "POST",
            "/api/auth/sign-in",
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(old_password.status, StatusCode::CONFLICT);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_progress_update_and_badge_award() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;
    let solve = json!({
        "questionDifficulty": "hard",
        "questionId": 7,
        "isSolved": true,
        "topicName": "Arrays"
    });

    let first = ctx
        .send("POST", "/api/progress/update", Some(solve.clone()), Some(&user.cookie))
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.body["progress"]["hardSolved"], 1);
    assert_eq!(first.body["progress"]["totalSolved"], 1);
    assert_eq!(first.body["progress"]["streakCount"], 1);

    // solving the same question again does not double count
    let again = ctx
        .send("POST", "/api/progress/update", Some(solve), Some(&user.cookie))
        .await;
    assert_eq!(again.body["progress"]["hardSolved"], 1);

    let someone_else = ctx
        .send(
            "POST",
            "/api/progress/update",
            Some(json!({ "userId": Uuid::new_v4().to_string(), "isSolved": true })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(someone_else.status, StatusCode::FORBIDDEN);

    let public = ctx
        .send("GET", &format!("/api/progress/{}", user.id), None, None)
        .await;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(public.body["progress"]["hardSolved"], 1);

    let no_badges = ctx
        .send("GET", &format!("/api/badges/{}", user.id), None, None)
        .await;
    assert_eq!(no_badges.status, StatusCode::NOT_FOUND);
    assert_eq!(no_badges.body["badges"], json!([]));

    let award = ctx
        .send(
            "POST",
            "/api/badges",
            Some(json!({ "badgeName": "Early_Bird" })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(award.status, StatusCode::OK);
    assert_eq!(award.body["message"], "Badges awarded successfully");

    let repeat = ctx
        .send(
            "POST",
            "/api/badges",
            Some(json!({ "badgeName": "Early_Bird" })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(repeat.body["message"], "No new badges to award");
    let names: Vec<&str> = repeat.body["badges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.iter().filter(|n| **n == "Early_Bird").count(), 1);

    let badges = ctx
        .send("GET", &format!("/api/badges/{}", user.id), None, None)
        .await;
    assert_eq!(badges.status, StatusCode::OK);
    assert!(badges.body["updatedAt"].is_string());

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_roadmap_progress() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;
    let catalog = RoadmapCatalog::bundled().unwrap();
    let roadmap = catalog.get("dsa-fundamentals").unwrap();
    let level = &roadmap.levels[0];
    let topic = &level.topics[0];
    let uri = "/api/roadmaps/dsa-fundamentals/progress";

    let initial = ctx.send("GET", uri, None, Some(&user.cookie)).await;
    assert_eq!(initial.status, StatusCode::OK, "{}", initial.body);
    assert_eq!(initial.body["stats"]["completedTopics"], 0);
    assert_eq!(initial.body["stats"]["totalTopics"], roadmap.total_topics());
    assert_eq!(initial.body["stats"]["currentLevel"], level.id.as_str());

    let updated = ctx
        .send(
            "POST",
            uri,
            Some(json!({
                "topicId": topic.id,
                "levelId": level.id,
                "status": "completed",
                "timeSpent": 45
            })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["stats"]["completedTopics"], 1);
    assert_eq!(updated.body["stats"]["totalTimeSpent"], 45);
    assert_eq!(updated.body["stats"]["streak"], 1);
    assert!(updated.body["progress"]["completedAt"].is_string());

    let bad_status = ctx
        .send(
            "POST",
            uri,
            Some(json!({ "topicId": topic.id, "levelId": level.id, "status": "done" })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(bad_status.status, StatusCode::BAD_REQUEST);

    let foreign_topic = ctx
        .send(
            "POST",
            uri,
            Some(json!({ "topicId": "not-a-topic", "levelId": level.id, "status": "completed" })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(foreign_topic.status, StatusCode::NOT_FOUND);

    let listed = ctx.send("GET", uri, None, Some(&user.cookie)).await;
    assert_eq!(listed.body["progress"].as_array().unwrap().len(), 1);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_quiz_results_and_stats() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;

    let empty = ctx
        .send("GET", &format!("/api/quiz-results/{}/stats", user.id), None, None)
        .await;
    assert_eq!(empty.body, json!({ "avgScore": 0.0, "totalQuizzes": 0 }));

    for (score, correct) in [(60, 6), (80, 8)] {
        let saved = ctx
            .send(
                "POST",
                "/api/quiz-results",
                Some(json!({
                    "quizId": "arrays-basics",
                    "score": score,
                    "totalQuestions": 10,
                    "correctAnswers": correct
                })),
                Some(&user.cookie),
            )
            .await;
        assert_eq!(saved.status, StatusCode::CREATED, "{}", saved.body);
        assert_eq!(saved.body["message"], "Result saved");
        assert_eq!(saved.body["result"]["quizType"], "MCQ");
    }

    let invalid = ctx
        .send(
            "POST",
            "/api/quiz-results",
            Some(json!({
                "quizId": "arrays-basics",
                "score": 10,
                "totalQuestions": 2,
                "correctAnswers": 3
            })),
            Some(&user.cookie),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let stats = ctx
        .send("GET", &format!("/api/quiz-results/{}/stats", user.id), None, None)
        .await;
    assert_eq!(stats.body["avgScore"], 70.0);
    assert_eq!(stats.body["totalQuizzes"], 2);
    assert_eq!(stats.body["history"][0]["score"], 80);

    let recent = ctx
        .send("GET", &format!("/api/quiz-results/{}/recent", user.id), None, None)
        .await;
    assert_eq!(recent.body.as_array().unwrap().len(), 2);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_interview_experience_round_trip() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let created = ctx
        .send(
            "POST",
            "/api/interview-experiences",
            Some(json!({
                "company": "Acme",
                "position": "SDE Intern",
                "author": "Linus",
                "tags": ["dsa"],
                "content": "Two rounds.",
                "roundes": 2,
                "level": "easy",
                "result": "selected"
            })),
            None,
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let fetched = ctx
        .send("GET", &format!("/api/interview-experiences/{}", id), None, None)
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["data"]["rounds"], 2);

    let missing = ctx
        .send(
            "GET",
            &format!("/api/interview-experiences/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "Interview not found");

    sqlx::query("DELETE FROM interview_experiences WHERE id = $1::uuid")
        .bind(&id)
        .execute(&ctx.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_email_preference_updates_user() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.signed_in_user().await;
    let uri = format!(
        "/api/email-preference?email={}&action=unsubscribe",
        user.email
    );

    let response = ctx.send("GET", &uri, None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "You have been unsubscribed from emails.");

    let subscribed: bool =
        sqlx::query_scalar("SELECT subscribed_to_emails FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert!(!subscribed);

    let unknown = ctx
        .send(
            "GET",
            &format!("/api/email-preference?email={}&action=newsletter", unique_email()),
            None,
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_potd_send_runs_once_per_day() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let secret = ctx.config.cron_secret.clone().unwrap();
    let headers = [("x-cron-secret", secret.as_str())];

    let first = ctx
        .send_with_headers("POST", "/api/potd/send", None, None, &headers)
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert!(first.body["problem"].is_string());

    let second = ctx
        .send_with_headers("POST", "/api/potd/send", None, None, &headers)
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["alreadySent"], true);
    assert_eq!(second.body["sent"], 0);
}
