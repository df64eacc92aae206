//! # CLI Command Implementations

use crate::api::{self, Role, TokenService};
use crate::config::{CONFIG_TEMPLATE, Config, StorageKind};
use dizmen_core::{
    ClockTime, DizmenError, Platform, PublicMenu, Restaurant, RestaurantId, UserId,
    VerificationAction, VerificationStatus,
};
use std::path::{Path, PathBuf};

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, DizmenError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        DizmenError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(DizmenError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| DizmenError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), DizmenError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!("Dizmen Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:     {}", config.server.addr());
    println!("  Storage:     {:?}", config.storage.backend);
    println!("  Database:    {}", config.storage.path.display());
    println!("  Review mode: {:?}", config.platform.review_mode);
    println!(
        "  Timezone:    {}",
        config.platform.timezone.as_deref().unwrap_or("host local time")
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write the configuration template and create an empty database.
pub fn cmd_init(config: &Config, config_path: &Path, force: bool) -> Result<(), DizmenError> {
    let config_out = validate_output_path(config_path)?;
    if config_out.exists() && !force {
        println!(
            "Configuration {} already exists (use --force to overwrite)",
            config_out.display()
        );
    } else {
        std::fs::write(&config_out, CONFIG_TEMPLATE)
            .map_err(|e| DizmenError::IoError(format!("Write config: {}", e)))?;
        println!("Wrote {}", config_out.display());
    }

    if config.storage.backend == StorageKind::Memory {
        println!("Storage backend is memory; no database to create");
        return Ok(());
    }

    let db_path = validate_output_path(&config.storage.path)?;
    if db_path.exists() {
        if !force {
            return Err(DizmenError::IoError(format!(
                "Database {} already exists (use --force to recreate)",
                db_path.display()
            )));
        }
        std::fs::remove_file(&db_path)
            .map_err(|e| DizmenError::IoError(format!("Remove database: {}", e)))?;
        tracing::warn!("Removed existing database {}", db_path.display());
    }

    Platform::with_redb(&db_path)?;
    println!("Created database {}", db_path.display());
    Ok(())
}

// =============================================================================
// TOKEN COMMAND
// =============================================================================

pub fn cmd_token(
    config: &Config,
    json_mode: bool,
    user: &str,
    role: &str,
    ttl: Option<u64>,
) -> Result<(), DizmenError> {
    let role: Role = role.parse()?;
    let user = UserId::new(user.trim());
    if user.as_str().is_empty() {
        return Err(DizmenError::ConfigError("--user must not be empty".to_string()));
    }
    let ttl_secs = ttl.unwrap_or(config.auth.token_ttl_secs);
    let tokens = TokenService::new(
        config.jwt_secret()?.as_bytes(),
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        ttl_secs,
    );
    let token = tokens.issue(&user, role)?;

    if json_mode {
        print_json(&serde_json::json!({
            "user_id": user,
            "role": role,
            "expires_in": ttl_secs,
            "token": token,
        }));
    } else {
        println!("{token}");
    }
    Ok(())
}

// =============================================================================
// RESTAURANTS COMMAND
// =============================================================================

pub fn cmd_restaurants(
    config: &Config,
    json_mode: bool,
    status: Option<&str>,
) -> Result<(), DizmenError> {
    let status = status
        .map(str::parse::<VerificationStatus>)
        .transpose()?;
    let platform = config.open_platform()?;
    let restaurants = platform.list_restaurants(status)?;
    let counts = platform.status_counts()?;

    if json_mode {
        print_json(&serde_json::json!({
            "restaurants": restaurants,
            "counts": counts
                .iter()
                .map(|(s, n)| (s.to_string(), *n))
                .collect::<std::collections::BTreeMap<_, _>>(),
        }));
        return Ok(());
    }

    println!("Dizmen Restaurants");
    println!("==================");
    for (status, n) in &counts {
        println!("  {:<9} {}", status.as_str(), n);
    }
    println!();
    if restaurants.is_empty() {
        println!("No restaurants");
    }
    for restaurant in &restaurants {
        print_restaurant_line(restaurant);
    }
    Ok(())
}

fn print_restaurant_line(restaurant: &Restaurant) {
    let note = restaurant
        .rejection_reason
        .as_deref()
        .or(restaurant.block_reason.as_deref())
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    println!(
        "{}  {:<9} rev {}  {}{}",
        restaurant.id, restaurant.verification_status, restaurant.revision, restaurant.name, note
    );
}

// =============================================================================
// VERIFICATION COMMANDS
// =============================================================================

pub fn cmd_verification(
    config: &Config,
    json_mode: bool,
    id: &str,
    action: VerificationAction,
    revision: Option<u64>,
) -> Result<(), DizmenError> {
    let mut platform = config.open_platform()?;
    let id = RestaurantId::new(id);
    let restaurant = platform.verification().act(&id, &action, revision)?;
    tracing::info!(
        event = "verification_changed",
        restaurant_id = %id,
        action = action.verb(),
        status = %restaurant.verification_status,
        "Verification status changed from CLI"
    );

    if json_mode {
        print_json(&serde_json::json!(restaurant));
    } else {
        print_restaurant_line(&restaurant);
    }
    Ok(())
}

// =============================================================================
// MENU COMMAND
// =============================================================================

pub fn cmd_menu(
    config: &Config,
    json_mode: bool,
    restaurant_id: &str,
    at: Option<&str>,
) -> Result<(), DizmenError> {
    let platform = config.open_platform()?;
    let id = RestaurantId::new(restaurant_id);
    let menu = match at {
        Some(at) => platform.public_menu_at(&id, ClockTime::parse(at)?)?,
        None => platform.public_menu(&id)?,
    };

    if json_mode {
        print_json(&serde_json::json!(menu));
        return Ok(());
    }
    print_public_menu(&menu);
    Ok(())
}

fn print_public_menu(menu: &PublicMenu) {
    println!("{} at {}", menu.restaurant.name, menu.evaluated_at);
    println!("{}", menu.restaurant.address);
    println!();
    if menu.menus.is_empty() {
        println!("Nothing is being served right now");
    }
    for section in &menu.menus {
        println!("== {} ==", section.menu.name);
        for item in &section.items {
            println!("  {:<40} {:>12}", item.name, item.price.to_string());
        }
        println!();
    }
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate every setting and open the storage once.
pub fn cmd_check(config: &Config, json_mode: bool) -> Result<(), DizmenError> {
    let mut problems: Vec<String> = Vec::new();

    if let Err(e) = config.timezone() {
        problems.push(e.to_string());
    }
    if let Err(e) = config.jwt_secret() {
        problems.push(e.to_string());
    }
    let counts = match config.open_platform() {
        Ok(platform) => Some(platform.status_counts()?),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    };

    if json_mode {
        print_json(&serde_json::json!({
            "ok": problems.is_empty(),
            "address": config.server.addr(),
            "database": config.storage.path.to_string_lossy(),
            "review_mode": config.platform.review_mode,
            "timezone": config.platform.timezone,
            "problems": problems,
            "restaurants": counts.map(|c| c.values().sum::<usize>()),
        }));
    } else {
        println!("Dizmen Configuration Check");
        println!("==========================");
        println!("Address:     {}", config.server.addr());
        println!("Storage:     {:?}", config.storage.backend);
        println!("Database:    {}", config.storage.path.display());
        println!("Review mode: {:?}", config.platform.review_mode);
        if let Some(counts) = &counts {
            println!("Restaurants: {}", counts.values().sum::<usize>());
        }
        println!();
        if problems.is_empty() {
            println!("OK");
        }
        for problem in &problems {
            println!("PROBLEM: {problem}");
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(DizmenError::ConfigError(format!(
            "{} configuration problem(s)",
            problems.len()
        )))
    }
}
