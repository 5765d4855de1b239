/// Testimonial endpoints
///
/// # Endpoints
///
/// - `GET  /api/testimonials`
/// - `POST /api/testimonials`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::present,
};
use axum::{extract::State, http::StatusCode, Json};
use dsamate_shared::models::testimonial::{
    CreateTestimonial, DisplayPreference, PublicTestimonial, Testimonial,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestimonialRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub designation: Option<String>,
    pub rating: Option<i32>,
    pub liked_most: Option<String>,
    pub how_helped: Option<String>,
    pub feedback: Option<String>,
    pub can_show: Option<bool>,
    pub display_preference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTestimonialResponse {
    pub success: bool,
    pub message: String,
    pub testimonial: PublicTestimonial,
}

impl CreateTestimonialRequest {
    fn into_create(self) -> ApiResult<CreateTestimonial> {
        let (
            Some(name),
            Some(email),
            Some(designation),
            Some(rating),
            Some(liked_most),
            Some(how_helped),
            Some(can_show),
        ) = (
            present(&self.name),
            present(&self.email),
            present(&self.designation),
            self.rating,
            present(&self.liked_most),
            present(&self.how_helped),
            self.can_show,
        )
        else {
            return Err(ApiError::BadRequest("All fields are required".to_string()));
        };

        if !(1..=5).contains(&rating) {
            return Err(ApiError::BadRequest(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let display_preference = if can_show {
            let raw = present(&self.display_preference).ok_or_else(|| {
                ApiError::BadRequest("Display preference is required".to_string())
            })?;
            DisplayPreference::parse(raw)
                .ok_or_else(|| ApiError::BadRequest("Invalid display preference".to_string()))?
        } else {
            DisplayPreference::NameAndDesignation
        };

        Ok(CreateTestimonial {
            name: name.to_string(),
            email: email.to_string(),
            designation: designation.to_string(),
            rating,
            liked_most: liked_most.to_string(),
            how_helped: how_helped.to_string(),
            feedback: present(&self.feedback).unwrap_or_default().to_string(),
            can_show,
            display_preference,
        })
    }
}

/// Public testimonials, newest first, with display preferences applied
pub async fn list_testimonials(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PublicTestimonial>>> {
    let testimonials = Testimonial::list_public(&state.db).await?;
    Ok(Json(testimonials.iter().map(Testimonial::to_public).collect()))
}

/// Submit a testimonial
///
/// # Errors
///
/// - `400 Bad Request`: missing field, rating outside 1..=5, missing or
///   unknown display preference for a public testimonial
/// - `422 Unprocessable Entity`: malformed e-mail
pub async fn create_testimonial(
    State(state): State<AppState>,
    Json(req): Json<CreateTestimonialRequest>,
) -> ApiResult<(StatusCode, Json<CreateTestimonialResponse>)> {
    req.validate()?;
    let data = req.into_create()?;

    let testimonial = Testimonial::create(&state.db, &data).await?;
    tracing::info!(
        testimonial_id = %testimonial.id,
        can_show = testimonial.can_show,
        "Testimonial submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateTestimonialResponse {
            success: true,
            message: "Testimonial submitted successfully".to_string(),
            testimonial: testimonial.to_public(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> serde_json::Value {
        serde_json::json!({
            "name": "Grace",
            "email": "grace@example.com",
            "designation": "SDE-1",
            "rating": 5,
            "likedMost": "The sheet",
            "howHelped": "Cleared interviews",
            "feedback": "Thanks",
            "canShow": true,
            "displayPreference": "nameOnly"
        })
    }

    fn request(json: serde_json::Value) -> CreateTestimonialRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_valid_request() {
        let data = request(body()).into_create().unwrap();
        assert_eq!(data.display_preference, DisplayPreference::NameOnly);
        assert!(data.can_show);
    }

    #[test]
    fn test_hidden_testimonial_forces_default_preference() {
        let mut json = body();
        json["canShow"] = serde_json::json!(false);
        json["displayPreference"] = serde_json::json!("anonymous");

        let data = request(json).into_create().unwrap();
        assert_eq!(data.display_preference, DisplayPreference::NameAndDesignation);
    }

    #[test]
    fn test_public_testimonial_requires_preference() {
        let mut json = body();
        json.as_object_mut().unwrap().remove("displayPreference");
        assert!(matches!(
            request(json).into_create(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_rating_out_of_range() {
        for rating in [0, 6] {
            let mut json = body();
            json["rating"] = serde_json::json!(rating);
            assert!(matches!(
                request(json).into_create(),
                Err(ApiError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn test_missing_field() {
        let mut json = body();
        json["howHelped"] = serde_json::json!("  ");
        assert!(matches!(
            request(json).into_create(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_feedback_is_optional() {
        let mut json = body();
        json.as_object_mut().unwrap().remove("feedback");
        assert_eq!(request(json).into_create().unwrap().feedback, "");
    }

    #[test]
    fn test_malformed_email_fails_validation() {
        let mut json = body();
        json["email"] = serde_json::json!("not-an-email");
        assert!(request(json).validate().is_err());
    }
}
