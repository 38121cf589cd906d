pub mod fetch;
pub mod show;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};

use bibweld_core::PubDb;

/// Render every publication as a table on stdout.
pub fn print_publications(db: &PubDb) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["Type", "Date", "Authors", "Title", "Refs"]);

    for (_, publication) in db.iter() {
        let authors = publication
            .authors
            .iter()
            .map(|&h| db.author_key(h).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row([
            Cell::new(publication.pubtype),
            Cell::new(
                publication
                    .date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(authors),
            Cell::new(publication.title().unwrap_or("<untitled>")),
            Cell::new(publication.refs.len()),
        ]);
    }

    println!("{table}");
}
