mod common;
mod orchestrator;
