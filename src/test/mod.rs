mod sender_window;
mod sim_time;
