pub(crate) mod address_resolver;
mod response_collector;
mod runner;
mod step;

pub(crate) use response_collector::ResponseCollector;
pub(crate) use runner::Runner;
pub(crate) use step::Step;
