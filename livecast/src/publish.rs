//! Streams elementary stream files into a running session at the frame rate.

use std::time::Duration;

use livecast_core::{
    sources::{AccessUnit, AdtsStream},
    BroadcastSession, Result,
};
use tokio::time::{interval, MissedTickBehavior};

/// Presentation time of frame `index`.
#[must_use]
pub fn frame_timestamp(index: u64, fps: u32) -> Duration {
    Duration::from_micros(index * 1_000_000 / u64::from(fps.max(1)))
}

/// Media read from the input files.
pub struct Media {
    pub video: Vec<AccessUnit>,
    pub audio: Option<AdtsStream>,
}

/// Push every access unit, one per frame period, with the audio frames that
/// fall before it. Returns the number of access units sent.
pub async fn stream(session: &BroadcastSession, media: &Media, fps: u32) -> Result<u64> {
    let mut ticker = interval(frame_timestamp(1, fps));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut audio_sent = 0_usize;
    if let Some(audio) = &media.audio {
        session
            .push_audio_frame(&audio.audio_specific_config, Duration::ZERO)
            .await?;
    }

    let mut sent = 0_u64;
    for unit in &media.video {
        ticker.tick().await;
        let pts = frame_timestamp(sent, fps);

        if let Some(audio) = &media.audio {
            let frame_duration = audio.frame_duration();
            while let Some(frame) = audio.frames.get(audio_sent) {
                let timestamp = frame_duration * audio_sent as u32;
                if timestamp > pts {
                    break;
                }
                session.push_audio_frame(frame, timestamp).await?;
                audio_sent += 1;
            }
        }

        for nal in &unit.nals {
            session.push_video_nal(nal, pts, pts).await?;
        }
        sent += 1;
        if sent % u64::from(fps.max(1) * 10) == 0 {
            tracing::debug!("{sent} frames sent");
        }
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timestamps() {
        assert_eq!(frame_timestamp(0, 30), Duration::ZERO);
        assert_eq!(frame_timestamp(1, 25), Duration::from_millis(40));
        assert_eq!(frame_timestamp(30, 30), Duration::from_secs(1));
        assert_eq!(frame_timestamp(1, 0), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_is_paced_at_frame_rate() {
        let session = BroadcastSession::new(640, 360, 10, 500_000);
        let media = Media {
            video: vec![AccessUnit::default(); 10],
            audio: None,
        };

        let started = tokio::time::Instant::now();
        assert_eq!(stream(&session, &media, 10).await.unwrap(), 10);
        // the first tick fires at once, the other nine a tenth of a second apart
        assert_eq!(started.elapsed(), Duration::from_millis(900));
    }
}
