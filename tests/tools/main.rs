//! Tests of the tools, running as separate processes

mod fixture;
