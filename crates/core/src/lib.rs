pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod face_box;
    pub mod frame;
}

pub mod provisioning {
    pub mod domain {
        pub mod artifact_fetcher;
        pub mod model_artifact;
    }
    pub mod infrastructure;
    pub mod model_provisioner;
}

pub mod inference {
    pub mod execution_provider;
    pub mod preprocess;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod classification {
    pub mod domain {
        pub mod age_gender_classifier;
        pub mod labels;
    }
    pub mod infrastructure;
}

pub mod annotation {
    pub mod frame_annotator;
}

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod display {
    pub mod domain {
        pub mod display_surface;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod frame_processor;
    pub mod pipeline_logger;
    pub mod presentation_loop;
    pub mod processor_factory;
}
