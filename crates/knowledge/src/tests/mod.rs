mod doubles;
mod query_flow;
