//! TypeScript declarations for the snapshot and model types.

use crate::alert::AlertView;
use crate::catalog::{CatalogQuery, Taxonomy};
use crate::library::FilteredList;
use crate::membership::Membership;
use crate::model::{Author, Demographic, Genre, Theme, Title, UserTitle};
use crate::pagination::FeedSnapshot;
use crate::search::{SearchSnapshot, SearchStatus};
use crate::store::ListName;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Regenerate every `.ts` file in `out_dir`, plus an `index.ts` re-exporting them.
pub fn export_ts_bindings(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<AlertView>(out_dir)?;
    export_single_type::<Author>(out_dir)?;
    export_single_type::<Genre>(out_dir)?;
    export_single_type::<Theme>(out_dir)?;
    export_single_type::<Demographic>(out_dir)?;
    export_single_type::<Title>(out_dir)?;
    export_single_type::<UserTitle>(out_dir)?;
    export_single_type::<CatalogQuery>(out_dir)?;
    export_single_type::<Taxonomy>(out_dir)?;
    export_single_type::<ListName>(out_dir)?;
    export_single_type::<FeedSnapshot>(out_dir)?;
    export_single_type::<SearchStatus>(out_dir)?;
    export_single_type::<SearchSnapshot>(out_dir)?;
    export_single_type::<Membership>(out_dir)?;
    export_single_type::<FilteredList>(out_dir)?;

    let index_content = r#"export type { AlertView } from "./AlertView";
export type { Author } from "./Author";
export type { Genre } from "./Genre";
export type { Theme } from "./Theme";
export type { Demographic } from "./Demographic";
export type { Title } from "./Title";
export type { UserTitle } from "./UserTitle";
export type { CatalogQuery } from "./CatalogQuery";
export type { Taxonomy } from "./Taxonomy";
export type { ListName } from "./ListName";
export type { FeedSnapshot } from "./FeedSnapshot";
export type { SearchStatus } from "./SearchStatus";
export type { SearchSnapshot } from "./SearchSnapshot";
export type { Membership } from "./Membership";
export type { FilteredList } from "./FilteredList";
"#;

    fs::write(out_dir.join("index.ts"), index_content).map_err(|err| {
        format!(
            "Failed to write {}: {err}",
            out_dir.join("index.ts").display()
        )
    })?;

    Ok(())
}
