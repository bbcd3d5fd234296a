use colored::Colorize;
use oniontree_ingest::ImportReport;
use oniontree_storage::StoreCounts;

pub fn print(report: &ImportReport, counts: &StoreCounts) {
    if report.truncated {
        println!("{} managed tables truncated", "•".yellow());
    }

    println!(
        "{} {} imported, {} failed",
        "✓".green(),
        report.succeeded.to_string().bold(),
        if report.failed.is_empty() {
            "0".normal()
        } else {
            report.failed.len().to_string().red().bold()
        }
    );
    println!(
        "  created: {} services, {} public keys, {} urls, {} tags, {} associations",
        report.created.services,
        report.created.public_keys,
        report.created.urls,
        report.created.tags,
        report.created.associations
    );
    println!(
        "  store:   {} services, {} public keys, {} urls, {} tags, {} associations",
        counts.services,
        counts.public_keys,
        counts.urls,
        counts.tags,
        counts.associations()
    );

    for failure in &report.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.path.display(),
            failure.message
        );
    }

    if report.cancelled {
        println!("{} cancelled before the tree was fully imported", "!".yellow());
    }
}
