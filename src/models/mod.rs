pub mod account;
pub mod catalog;
pub mod history;
pub mod movie;
pub mod review;

pub use account::{
    Account, NewAccount, Preference, PreferenceResponse, PreferenceUpdate, Role, UserResponse,
};
pub use catalog::{
    CatalogCredits, CatalogGenre, CatalogMovie, CatalogMovieDetail, CatalogPage, CatalogVideo,
    DiscoverQuery,
};
pub use history::{ChatMessage, Sender, WatchHistoryEntry, WatchHistoryResponse};
pub use movie::{
    CreateMovieRequest, Genre, Movie, MovieFilter, MovieResponse, MovieSource, NewMovie,
};
pub use review::{
    CreateReviewRequest, NewReview, RatingSummary, Review, UpdateReviewRequest,
};
