//! `volley list`

use volley_workloads::catalog;

/// Print every built-in workload with its scenarios
pub fn list_workloads() {
    for entry in catalog() {
        let scenarios: Vec<String> = (entry.profiles)().into_keys().collect();
        println!("{}", entry.name);
        println!("    {}", entry.description);
        println!("    scenarios: {}", scenarios.join(", "));
    }
}
