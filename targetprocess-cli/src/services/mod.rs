// Reusable services layer
//
// Services here sit between the API client and the presentation layer and
// can be shared by the CLI and any other front end.

pub mod pagination;

pub use pagination::{Page, PaginationConfig, ResultPaginator};
