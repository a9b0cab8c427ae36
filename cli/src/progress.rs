use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use painting_restoration::{TrainingProgress, TrainingUpdate};

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Two progress bars, one for the whole training run and one for the
/// current epoch along with its latest loss
pub struct TrainingBars {
    // dropping this would detach the bars from each other
    _multi: MultiProgress,

    total_pb: ProgressBar,
    epoch_pb: ProgressBar,

    total_len: u64,
    epoch_len: u64,
    epoch_num: Option<u32>,
}

impl TrainingBars {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let total_pb = multi.add(ProgressBar::new(100));
        total_pb.set_style(style("[{elapsed_precise}] {bar:40.cyan/blue} {percent}%"));

        let epoch_pb = multi.add(ProgressBar::new(100));
        epoch_pb.set_style(style(" epoch {prefix:>3} {bar:40.cyan/blue} {pos}/{len} {msg}"));

        Self {
            _multi: multi,
            total_pb,
            epoch_pb,
            total_len: 100,
            epoch_len: 100,
            epoch_num: None,
        }
    }
}

impl Drop for TrainingBars {
    fn drop(&mut self) {
        self.total_pb.finish();
        self.epoch_pb.finish();
    }
}

impl TrainingProgress for TrainingBars {
    fn update(&mut self, update: TrainingUpdate) {
        let batches = update.batches as u64;
        let total = u64::from(update.epochs) * batches;

        if total != self.total_len {
            self.total_len = total;
            self.total_pb.set_length(total);
        }

        if batches != self.epoch_len {
            self.epoch_len = batches;
            self.epoch_pb.set_length(batches);
        }

        if self.epoch_num != Some(update.epoch) {
            self.epoch_num = Some(update.epoch);
            self.epoch_pb.set_prefix((update.epoch + 1).to_string());
        }

        let done = update.batch as u64 + 1;
        self.total_pb
            .set_position(u64::from(update.epoch) * batches + done);
        self.epoch_pb.set_position(done);
        self.epoch_pb.set_message(format!("loss {:.5}", update.loss));
    }
}
