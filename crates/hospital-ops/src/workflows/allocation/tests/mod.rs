mod common;
mod upsert;
