use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

macro_rules! metrics {
    (
        $pub_container:ty {
            $field:ident: $internal_container:ident {
                $(
                    $(#[$meta:meta])*
                    $metric:ident: $ty:ident -> $pub_ty:ident,
                )*
            }
        }
    ) => {
        #[derive(Default)]
        pub(crate) struct $internal_container {
            $(
                $(#[$meta])*
                pub(crate) $metric: $ty,
            )*
        }

        impl $internal_container {
            pub fn sample(&self) -> impl Iterator<Item = emit::metric::Metric<'static, emit::empty::Empty>> + 'static {
                let $internal_container { $($metric),* } = self;

                [$(
                    emit::metric::Metric::new(
                        emit::Path::new_raw(env!("CARGO_PKG_NAME")),
                        stringify!($metric),
                        <$ty>::AGG,
                        emit::empty::Empty,
                        $metric.sample(),
                        emit::empty::Empty,
                    ),
                )*]
                .into_iter()
            }
        }

        impl $pub_container {
            $(
                $(#[$meta])*
                pub fn $metric(&self) -> $pub_ty {
                    self.$field.$metric.sample()
                }
            )*
        }
    };
}

#[derive(Default)]
pub(crate) struct Counter(AtomicUsize);

impl Counter {
    const AGG: &'static str = emit::well_known::METRIC_AGG_COUNT;

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/**
Counters describing the health of a [`crate::FileWriter`].

Each counter starts at zero when the writer is built.
*/
#[derive(Clone)]
pub struct FileWriterMetrics {
    pub(crate) metrics: Arc<InternalMetrics>,
}

impl FileWriterMetrics {
    /**
    Get all counters as `emit` metrics.

    Each metric is a running count, named after its counter.
    */
    pub fn sample(&self) -> impl Iterator<Item = emit::metric::Metric<'static, emit::empty::Empty>> + 'static {
        self.metrics.sample()
    }
}

impl emit::metric::Source for FileWriterMetrics {
    fn sample_metrics<S: emit::metric::sampler::Sampler>(&self, sampler: S) {
        for metric in self.metrics.sample() {
            sampler.metric(metric);
        }
    }
}

metrics!(
    FileWriterMetrics {
        metrics: InternalMetrics {
            /**
            A file was created, or an existing one was replaced.
            */
            file_create: Counter -> usize,
            /**
            An existing file was continued when the writer started.
            */
            file_continue: Counter -> usize,
            /**
            Attempting to open a file failed.
            */
            file_open_failed: Counter -> usize,
            /**
            The writer moved on to a new file.
            */
            file_rotate: Counter -> usize,
            /**
            Writing or flushing a file failed.
            */
            file_write_failed: Counter -> usize,
            /**
            An old file was deleted to keep within the configured number of backups.
            */
            file_delete: Counter -> usize,
            /**
            Attempting to delete an old file failed.
            */
            file_delete_failed: Counter -> usize,
            /**
            An entry couldn't be rendered, so it was discarded.
            */
            entry_format_failed: Counter -> usize,
        }
    }
);
