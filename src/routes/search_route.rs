use crate::error::AppError;
use crate::routes::AppState;
use crate::search::{SearchRequest, SearchResult};
use rocket::get;
use rocket::serde::json::Json;
use rocket::State;

/// GET /api/journeys/search — `SearchJourneys` (spec.md §6).
#[get("/journeys/search?<src>&<dst>&<date>&<passengers>&<sort_by>&<limit>")]
pub async fn search_journeys(
    state: &State<AppState>,
    src: String,
    dst: String,
    date: String,
    passengers: u32,
    sort_by: Option<String>,
    limit: Option<usize>,
) -> Result<Json<SearchResult>, AppError> {
    let date = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {date}")))?;

    if let Some(s) = &sort_by {
        if !crate::config::Settings::sort_allowed().contains(&s.as_str()) {
            return Err(AppError::InvalidInput(format!("unsupported sortBy: {s}")));
        }
    }

    let result = state
        .search
        .search(SearchRequest {
            src: src.to_uppercase(),
            dst: dst.to_uppercase(),
            date,
            passengers,
            sort_by,
            limit,
        })
        .await?;

    Ok(Json(result))
}
