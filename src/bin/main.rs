#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::net::Ipv4Addr;

use embassy_executor::Spawner;
use embassy_futures::join::{join3, join4};
use embassy_net::{Ipv4Cidr, Stack, StackResources, StaticConfigV4, tcp::TcpSocket};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex, signal::Signal};
use embassy_time::{Duration as EmbassyDuration, Timer};
use embedded_io_async::Write as _;
use esp_hal::{
    clock::CpuClock,
    gpio::{Level, Output, OutputConfig},
    i2c::master::{Config as I2cConfig, I2c},
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{ApConfig, AuthMethod, ModeConfig};
use log::{LevelFilter, info, warn};
use panel_core::{
    http::{ConnectionContext, HEADER_BUF_BYTES, PANEL_PATH, handle_request},
    panel::{ALARM_TICK_MS, AlarmTick, Panel},
    status::StatusScreen,
};
use panel_hal::{display::StatusDisplay, outputs::BoardOutputs};
use ssd1306::{I2CDisplayInterface, prelude::WriteOnlyDataCommand};
use static_cell::StaticCell;

use dhcp::AddressPool;

#[path = "main/dhcp.rs"]
mod dhcp;
#[path = "main/dns.rs"]
mod dns;

const AP_SSID: &str = match option_env!("DOGLAB_AP_SSID") {
    Some(ssid) => ssid,
    None => "picow_test",
};
const AP_PASSWORD: &str = match option_env!("DOGLAB_AP_PASSWORD") {
    Some(password) => password,
    None => "password",
};

const GATEWAY_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
const NETMASK_PREFIX: u8 = 24;
const HTTP_PORT: u16 = 80;
const SOCKET_TIMEOUT_SECS: u64 = 10;
const ACCEPT_RETRY_DELAY_MS: u64 = 500;
const DHCP_POOL_SIZE: u8 = 8;
const DISPLAY_I2C_KHZ: u32 = 400;

static NET_RESOURCES: StaticCell<StackResources<6>> = StaticCell::new();
/// Latest display refresh; intermediate screens may be skipped.
static STATUS: Signal<CriticalSectionRawMutex, StatusScreen> = Signal::new();
/// Raised by the request path on a fresh alarm engage; arms the oscillator.
static ALARM_ENGAGED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

type SharedPanel = Mutex<CriticalSectionRawMutex, Panel<BoardOutputs<Output<'static>>>>;

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

async fn serve_loop(stack: Stack<'_>, panel: &SharedPanel) -> ! {
    let mut rx_buffer = [0u8; 1024];
    let mut tx_buffer = [0u8; 2048];
    let mut request = [0u8; HEADER_BUF_BYTES];
    let mut ctx: ConnectionContext = ConnectionContext::new();

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(EmbassyDuration::from_secs(SOCKET_TIMEOUT_SECS)));

        if let Err(err) = socket.accept(HTTP_PORT).await {
            warn!("http accept error: {:?}", err);
            Timer::after_millis(ACCEPT_RETRY_DELAY_MS).await;
            continue;
        }

        // Only the bytes fitting the bounded request buffer are ever parsed;
        // the remainder of an oversized request is dropped on close.
        let request_len = match socket.read(&mut request).await {
            Ok(0) => {
                socket.close();
                continue;
            }
            Ok(n) => n,
            Err(err) => {
                warn!("http read error: {:?}", err);
                socket.abort();
                continue;
            }
        };

        let effects = {
            let mut panel = panel.lock().await;
            handle_request(&mut panel, &request[..request_len], GATEWAY_IP, &mut ctx)
        };
        if let Some(screen) = effects.screen {
            STATUS.signal(screen);
        }
        if effects.alarm_engaged {
            ALARM_ENGAGED.signal(());
        }

        if let Err(err) = socket.write_all(ctx.header_bytes()).await {
            warn!("http header write error: {:?}", err);
            socket.abort();
            continue;
        }
        if !ctx.body_bytes().is_empty()
            && let Err(err) = socket.write_all(ctx.body_bytes()).await
        {
            warn!("http body write error: {:?}", err);
            socket.abort();
            continue;
        }

        let _ = socket.flush().await;
        socket.close();
    }
}

async fn alarm_loop(panel: &SharedPanel) -> ! {
    loop {
        ALARM_ENGAGED.wait().await;
        // An engage landing inside a stop window is serviced by the tick
        // loop that is still running, leaving this signal latched. Consuming
        // the stale latch must not start ticking an idle session: that tick
        // would force RED and BUZZER low over later request-path writes.
        if !panel.lock().await.alarm_active() {
            continue;
        }
        info!("alarm engaged; oscillating every {}ms", ALARM_TICK_MS);

        loop {
            Timer::after_millis(ALARM_TICK_MS).await;
            let (tick, screen) = {
                let mut panel = panel.lock().await;
                let tick = panel.alarm_tick();
                let screen = match tick {
                    AlarmTick::Blink(phase) => StatusScreen::Evacuate { phase },
                    AlarmTick::Stopped => panel.levels_screen(),
                };
                (tick, screen)
            };
            STATUS.signal(screen);
            if tick == AlarmTick::Stopped {
                info!("alarm stood down");
                break;
            }
        }
    }
}

async fn display_loop<DI: WriteOnlyDataCommand>(display: &mut StatusDisplay<DI>) -> ! {
    loop {
        let screen = STATUS.wait().await;
        display.show(screen);
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: doglab panel starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Actuator wiring used by this board:
    // RED=GPIO13, GREEN=GPIO11, BLUE=GPIO12, BUZZER=GPIO10
    let red = Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default());
    let green = Output::new(peripherals.GPIO11, Level::Low, OutputConfig::default());
    let blue = Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default());
    let buzzer = Output::new(peripherals.GPIO10, Level::Low, OutputConfig::default());
    let panel_state = Panel::new(BoardOutputs::new(red, green, blue, buzzer));

    // Status display wiring: SDA=GPIO14, SCL=GPIO15
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(DISPLAY_I2C_KHZ)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO14)
    .with_scl(peripherals.GPIO15);

    let mut display = StatusDisplay::new(I2CDisplayInterface::new(i2c));
    if let Err(err) = display.initialize() {
        info!("display initialize failed: {:?}", err);
    }
    // First screen: all actuators off, before the network comes up.
    display.show(panel_state.levels_screen());
    let panel: SharedPanel = Mutex::new(panel_state);

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        };

    let ap_config = ApConfig::default()
        .with_ssid(AP_SSID.into())
        .with_password(AP_PASSWORD.into())
        .with_auth_method(AuthMethod::Wpa2Personal);
    if let Err(err) = wifi_controller.set_config(&ModeConfig::Ap(ap_config)) {
        info!("wifi ap config failed: {:?}", err);
        loop {
            Timer::after_secs(1).await;
        }
    }
    if let Err(err) = wifi_controller.start_async().await {
        info!("wifi start failed: {:?}", err);
        loop {
            Timer::after_secs(1).await;
        }
    }

    let network = Ipv4Cidr::new(GATEWAY_IP, NETMASK_PREFIX);
    let stack_config = embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: network,
        gateway: None,
        dns_servers: heapless::Vec::new(),
    });
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.ap,
        stack_config,
        NET_RESOURCES.init(StackResources::new()),
        0x7C3D_5A1E_44B2_90F7,
    );

    let pool = AddressPool {
        start: Ipv4Addr::new(
            GATEWAY_IP.octets()[0],
            GATEWAY_IP.octets()[1],
            GATEWAY_IP.octets()[2],
            GATEWAY_IP.octets()[3] + 1,
        ),
        size: DHCP_POOL_SIZE,
    };

    info!("access point \"{}\" up, gateway {}", AP_SSID, GATEWAY_IP);
    info!("panel served at http://{}{}", GATEWAY_IP, PANEL_PATH);
    info!("Actuator pins: RED=GPIO13 GREEN=GPIO11 BLUE=GPIO12 BUZZER=GPIO10");
    info!("Display pins: SDA=GPIO14 SCL=GPIO15");

    let net_future = net_runner.run();
    let http_future = serve_loop(stack, &panel);
    let alarm_future = alarm_loop(&panel);
    let display_future = display_loop(&mut display);
    let dhcp_future = dhcp::serve(stack, GATEWAY_IP, network.netmask(), pool);
    let dns_future = dns::serve(stack, GATEWAY_IP);

    let _ = join4(
        net_future,
        http_future,
        alarm_future,
        join3(display_future, dhcp_future, dns_future),
    )
    .await;
    unreachable!()
}
