use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPool;

use crate::errors::Result;

///
/// A progress bar in the usual `[elapsed] ####---- pos/len msg` style.
///
pub fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
    {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

///
/// Dedicated rayon pool for the per-promoter work.
///
pub fn thread_pool(num_threads: usize) -> Result<ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?)
}
