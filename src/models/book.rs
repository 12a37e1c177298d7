//! Book model, loan state and related request types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// ISBN-10 or ISBN-13, digits only
static ISBN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}(\d{3})?$").expect("valid ISBN pattern"));

pub fn validate_isbn(isbn: &str) -> AppResult<()> {
    if ISBN_RE.is_match(isbn) {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid ISBN format".to_string()))
    }
}

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_id: i32,
    pub published_date: Option<String>,
    pub available: bool,
    pub last_borrowed_date: Option<DateTime<Utc>>,
}

impl Book {
    pub fn state(&self) -> LoanState {
        if self.available {
            LoanState::Available
        } else {
            LoanState::Borrowed
        }
    }
}

/// Lending state of a single book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Available,
    Borrowed,
}

/// Book joined with its author's name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub published_date: Option<String>,
    pub available: bool,
    pub last_borrowed_date: Option<DateTime<Utc>>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,
    pub isbn: String,
    pub author_id: i32,
    pub published_date: Option<String>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author_id: Option<i32>,
    pub published_date: Option<String>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive title substring
    pub title: Option<String>,
    /// Case-insensitive author name substring
    pub author_name: Option<String>,
    pub available: Option<bool>,
}
