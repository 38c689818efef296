pub mod error;
pub mod health;
pub mod rate_limit;
pub mod rest_api;
pub mod state;

#[macro_export]
macro_rules! repository_from_request {
    ($repo:ty) => {
        impl axum::extract::FromRequestParts<$crate::state::AppState> for $repo {
            type Rejection = std::convert::Infallible;

            fn from_request_parts(
                _parts: &mut http::request::Parts,
                state: &$crate::state::AppState,
            ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>>
                   + core::marker::Send {
                futures::future::ready(std::result::Result::Ok(<$repo>::new(
                    state.movies().clone(),
                )))
            }
        }
    };
}
