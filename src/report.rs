pub mod io;
pub mod journal;
pub mod polars_ext;
pub mod summary;
