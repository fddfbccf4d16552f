//! Test suites for the server bootstrap and REST layer.

mod rest_behaviour;
mod support;
