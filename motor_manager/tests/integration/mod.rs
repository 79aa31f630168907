mod enable_sequence;
mod fixtures;
mod link_policy;
mod protocol_errors;
mod runner;
mod stop_sequence;
