use std::error::Error;

use annotation_engine::config::AnnotationConfig;
use annotation_engine::engine::core::app_setup::create_app;
use annotation_engine::gateway::SharedGateway;
use annotation_engine::gateway::http::HttpInventoryGateway;

fn main() -> Result<(), Box<dyn Error>> {
    let config = AnnotationConfig::from_env()?;
    let gateway = HttpInventoryGateway::from_config(&config)?;

    create_app(config, SharedGateway::new(gateway)).run();
    Ok(())
}
