//! `cloudgate templates` command implementation.

use cloudgate_policy::PolicyTemplate;

pub fn run() {
    println!("\n📚 Policy templates:");
    println!("{}", "─".repeat(60));
    for (name, description) in PolicyTemplate::CATALOG {
        println!("  {:<32} {}", name, description);
    }
    println!("\nReference one in a settings file with `- template: <name>`.");
}
