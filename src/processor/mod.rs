pub mod note_parser;
pub mod stop_clustering;
