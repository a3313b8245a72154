// Localization add-ons offered during first boot

pub const LOCALIZATIONS: [&str; 46] = [
    "austria", "argentina", "brazil", "belgium", "bulgaria", "belarus", "chile", "croacia",
    "costa-rica", "colombia", "china", "canada", "cambodia", "ecuador", "ethiopia", "estonia",
    "france", "finland", "germany", "greece", "italy", "iran", "ireland", "indonesia", "india",
    "japan", "mexico", "morocco", "macedonia", "portugal", "poland", "peru", "romania", "russia",
    "spain", "switzerland", "slovenia", "thailand", "turkey", "taiwan", "usa", "united-kingdom",
    "uruguay", "ukraine", "venezuela", "vietnam",
];

/// Answer that ends the selection loop.
pub const DONE: &str = "done";

const COLUMNS: usize = 4;
const CELL_WIDTH: usize = 14;

pub fn is_known(name: &str) -> bool {
    LOCALIZATIONS.contains(&name)
}

/// The selection prompt body: a 4-column grid of names plus instructions.
pub fn selection_menu() -> String {
    let rule = "-".repeat(COLUMNS * (CELL_WIDTH + 1));
    let mut out =
        String::from("Enter the name of a localization module to install from the list:\n\n");
    for row in LOCALIZATIONS.chunks(COLUMNS) {
        let cells: Vec<String> = row
            .iter()
            .map(|name| format!("{:^width$}", name, width = CELL_WIDTH))
            .collect();
        out.push_str(&cells.join("|"));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
    }
    out.push_str(&format!(
        "\nEnter '{}' when you have finished selecting modules:",
        DONE
    ));
    out
}
