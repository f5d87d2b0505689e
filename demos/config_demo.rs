use scrubline::config::{ConfigManager, PlayerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration Management System Demo");
    println!("====================================");

    let config_path = std::env::temp_dir().join("scrubline-config-demo.toml");
    let mut config_manager = ConfigManager::with_path(config_path.clone())?;
    config_manager.reset_to_defaults()?;

    println!("Default configuration:");
    print_config(config_manager.get_config());

    println!("\nModifying configuration...");
    config_manager.set_volume(0.6)?;
    config_manager.set_samples_divider(1)?;
    config_manager.set_merge_amount(3)?;
    config_manager.update_config(|config| {
        config.video.playback_rates = vec![0.75, 1.0, 1.25];
    })?;

    println!("Updated configuration (divider 1 is clamped to 2):");
    print_config(config_manager.get_config());

    println!("\nTOML representation:");
    let toml_string = toml::to_string_pretty(config_manager.get_config())?;
    println!("{}", toml_string);

    let reloaded = ConfigManager::with_path(config_path.clone())?;
    println!(
        "Reloaded from {}: {}",
        config_path.display(),
        if reloaded.get_config() == config_manager.get_config() { "identical" } else { "different" }
    );

    Ok(())
}

fn print_config(config: &PlayerConfig) {
    println!("  Canvas: {}x{}", config.waveform.canvas_width, config.waveform.canvas_height);
    println!("  Bar colors: {} / {}", config.waveform.bar_color, config.waveform.listened_bar_color);
    println!("  Samples divider: {}", config.waveform.samples_divider);
    println!("  Merge amount: {}", config.waveform.merge_amount);
    println!("  Seek step: {}s", config.video.seek_step_seconds);
    println!("  Playback rates: {:?}", config.video.playback_rates);
    println!("  Volume: {}", config.video.default_volume);
}
