use std::fs;
use std::path::Path;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Whether the machine is running on mains power.
///
/// Machines that report no mains adapter at all (desktops, VMs) count as
/// being on AC.
pub fn on_ac_power() -> bool {
    on_ac_power_in(Path::new(POWER_SUPPLY_DIR))
}

pub(crate) fn on_ac_power_in(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return true;
    };

    let mut saw_mains = false;
    for entry in entries.flatten() {
        let supply = entry.path();
        let kind = read_attr(&supply, "type");
        if kind.as_deref() != Some("Mains") {
            continue;
        }
        saw_mains = true;
        if read_attr(&supply, "online").as_deref() == Some("1") {
            return true;
        }
    }
    !saw_mains
}

fn read_attr(supply: &Path, attr: &str) -> Option<String> {
    fs::read_to_string(supply.join(attr))
        .ok()
        .map(|value| value.trim().to_string())
}
