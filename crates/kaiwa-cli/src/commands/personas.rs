use std::path::Path;

use anyhow::Result;

use crate::runtime;

pub async fn list(config_path: &Path) -> Result<()> {
    let registry = runtime::load_registry(config_path).await?;

    println!("🎭 {} personas\n", registry.len());
    for persona in registry.all() {
        let marker = if persona.active { "✓" } else { "-" };
        println!("  {} {} ({})", marker, persona.display_name, persona.id);
        println!("      {}", persona.personality);
        if !persona.interests.is_empty() {
            println!("      interests: {}", persona.interests.join(", "));
        }
    }
    Ok(())
}
