//! Content provider boundary.
//!
//! Goals, headlines and quiz questions come from a [`ContentProvider`]. The simulation never
//! calls a provider inline: it queues [`ContentRequest`]s on a [`ContentDispatch`] and applies
//! whatever [`ContentResponse`]s have arrived at the start of the next tick. Whether the
//! provider cycles static tables or talks to a remote model is invisible to the core.

mod dispatch;
mod static_tables;

use serde::{Deserialize, Serialize};

use crate::city::{CityStats, Goal, Headline};
use crate::grid::Grid;

pub use dispatch::{BackgroundDispatch, InlineDispatch};
pub use static_tables::StaticContent;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("content unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub topic: String,
}

pub trait ContentProvider: Send {
    fn next_goal(&mut self, stats: &CityStats, grid: &Grid) -> Result<Goal, ContentError>;
    fn news_item(&mut self, stats: &CityStats) -> Result<Headline, ContentError>;
    fn quiz_question(&mut self, topic: Option<&str>) -> Result<QuizQuestion, ContentError>;
}

impl<P: ContentProvider + ?Sized> ContentProvider for Box<P> {
    fn next_goal(&mut self, stats: &CityStats, grid: &Grid) -> Result<Goal, ContentError> {
        (**self).next_goal(stats, grid)
    }

    fn news_item(&mut self, stats: &CityStats) -> Result<Headline, ContentError> {
        (**self).news_item(stats)
    }

    fn quiz_question(&mut self, topic: Option<&str>) -> Result<QuizQuestion, ContentError> {
        (**self).quiz_question(topic)
    }
}

#[derive(Debug, Clone)]
pub enum ContentRequest {
    Goal { stats: CityStats, grid: Grid },
    News { stats: CityStats },
    Quiz { ticket: u64, topic: Option<String> },
}

#[derive(Debug, Clone)]
pub enum ContentResponse {
    Goal(Result<Goal, ContentError>),
    News(Result<Headline, ContentError>),
    Quiz {
        ticket: u64,
        result: Result<QuizQuestion, ContentError>,
    },
}

impl ContentRequest {
    pub fn resolve<P: ContentProvider + ?Sized>(self, provider: &mut P) -> ContentResponse {
        match self {
            ContentRequest::Goal { stats, grid } => {
                ContentResponse::Goal(provider.next_goal(&stats, &grid))
            }
            ContentRequest::News { stats } => ContentResponse::News(provider.news_item(&stats)),
            ContentRequest::Quiz { ticket, topic } => ContentResponse::Quiz {
                ticket,
                result: provider.quiz_question(topic.as_deref()),
            },
        }
    }

    /// The response for a request that never reached a provider.
    pub fn unavailable(&self, reason: &str) -> ContentResponse {
        let err = ContentError::Unavailable(reason.to_string());
        match self {
            ContentRequest::Goal { .. } => ContentResponse::Goal(Err(err)),
            ContentRequest::News { .. } => ContentResponse::News(Err(err)),
            ContentRequest::Quiz { ticket, .. } => ContentResponse::Quiz {
                ticket: *ticket,
                result: Err(err),
            },
        }
    }
}

/// Fire-and-forget transport between the session and a provider.
pub trait ContentDispatch: Send {
    fn dispatch(&mut self, request: ContentRequest);
    /// Responses that have arrived since the last poll. Never blocks.
    fn poll(&mut self) -> Vec<ContentResponse>;
}
