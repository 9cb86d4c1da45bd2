mod cursor;
mod store;
mod types;

pub use cursor::RecordCursor;
pub use store::{EdgeDirection, GraphStore, PROPS_FIELD, Pagination};
pub(crate) use types::{EDGE_COLUMNS, VERTEX_COLUMNS, props_to_sql};
pub use types::{Edge, Record, Vertex, row_to_edge, row_to_vertex};
