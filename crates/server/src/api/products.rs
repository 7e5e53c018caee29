//! Product mutation endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub status: &'static str,
    pub product_id: u64,
}

/// `POST /add-product/{product_id}`: index a product from the data
/// source, replacing any existing entry for the same id.
pub async fn add_product(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.index.add(product_id).await?;
    Ok(Json(MutationResponse {
        status: "added",
        product_id,
    }))
}

/// `POST /delete-product/{product_id}`: remove a product from the index.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.index.delete(product_id).await?;
    Ok(Json(MutationResponse {
        status: "deleted",
        product_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_response_shape() {
        let response = MutationResponse {
            status: "added",
            product_id: 42,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "added");
        assert_eq!(json["product_id"], 42);
    }
}
